use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::Hasher;
use std::ops::Range;
use std::rc::Rc;

use gpui::*;
use gpui_component::{
    ActiveTheme, VirtualListScrollHandle, h_flex, label::Label, v_flex, v_virtual_list,
};

use crate::chat::message::{ChatMessage, FeedPhase, RowAlignment, Viewer, avatar_label};

const DEFAULT_CONTENT_WIDTH: Pixels = px(680.);
const LIST_HORIZONTAL_PADDING: Pixels = px(16.);
const CONTENT_WIDTH_CHANGE_EPSILON: f32 = 1.0;
const BUBBLE_MAX_WIDTH: Pixels = px(540.);
const BUBBLE_PADDING_X: Pixels = px(14.);
const BUBBLE_PADDING_Y: Pixels = px(10.);
const AVATAR_SIZE: Pixels = px(40.);
const AVATAR_GAP: Pixels = px(8.);
const ESTIMATED_TEXT_LINE_HEIGHT: Pixels = px(18.);
const ESTIMATED_CHAR_WIDTH: f32 = 7.0;
const FOLLOW_RESUME_THRESHOLD: Pixels = px(24.);
const SCROLL_DELTA_EPSILON: f32 = 1.0;

struct SizeCacheEntry {
    layout_hash: u64,
    height: Pixels,
    measured: bool,
}

/// Keeps the list glued to the newest message until the user scrolls away
/// from the tail, and resumes once they return near the bottom.
struct FollowState {
    scroll_handle: VirtualListScrollHandle,
    pending_scroll_to_bottom: bool,
    follow_bottom: bool,
    last_scroll_offset: Pixels,
    last_max_offset: Pixels,
}

impl FollowState {
    fn new() -> Self {
        Self {
            scroll_handle: VirtualListScrollHandle::new(),
            pending_scroll_to_bottom: false,
            follow_bottom: true,
            last_scroll_offset: Pixels::ZERO,
            last_max_offset: Pixels::ZERO,
        }
    }

    fn handle(&self) -> &VirtualListScrollHandle {
        &self.scroll_handle
    }

    fn bounds(&self) -> Bounds<Pixels> {
        self.scroll_handle.bounds()
    }

    fn request_follow(&mut self) {
        if self.follow_bottom || self.was_near_bottom() {
            self.pending_scroll_to_bottom = true;
        }
    }

    fn update(&mut self) {
        let offset = self.scroll_handle.offset().y;
        let max_offset = self.scroll_handle.max_offset().height;
        let offset_delta = f32::from(offset) - f32::from(self.last_scroll_offset);
        let max_delta = (f32::from(max_offset) - f32::from(self.last_max_offset)).abs();
        let content_size_changed = max_delta > SCROLL_DELTA_EPSILON;
        let user_scrolled_up = offset_delta > SCROLL_DELTA_EPSILON && !content_size_changed;
        let user_scrolled_down = offset_delta < -SCROLL_DELTA_EPSILON && !content_size_changed;

        if self.pending_scroll_to_bottom || (content_size_changed && self.was_near_bottom()) {
            self.follow_bottom = true;
        } else if self.follow_bottom {
            // Pause follow mode only when the user scrolls away from the tail.
            if user_scrolled_up {
                self.follow_bottom = false;
            }
        } else if user_scrolled_down && self.is_near_bottom() {
            self.follow_bottom = true;
        }

        self.last_scroll_offset = offset;
        self.last_max_offset = max_offset;
    }

    fn apply_pending(&mut self) {
        if self.follow_bottom || self.pending_scroll_to_bottom {
            let max_offset = self.scroll_handle.max_offset().height;
            let current_x = self.scroll_handle.offset().x;
            let target_y = if max_offset > Pixels::ZERO {
                -max_offset
            } else {
                Pixels::ZERO
            };
            self.scroll_handle.set_offset(point(current_x, target_y));
        }

        self.pending_scroll_to_bottom = false;
    }

    fn is_near_bottom(&self) -> bool {
        Self::near_bottom(
            self.scroll_handle.offset().y,
            self.scroll_handle.max_offset().height,
        )
    }

    fn was_near_bottom(&self) -> bool {
        Self::near_bottom(self.last_scroll_offset, self.last_max_offset)
    }

    fn near_bottom(offset: Pixels, max_offset: Pixels) -> bool {
        if max_offset <= Pixels::ZERO {
            return true;
        }

        // GPUI scroll offsets go negative downward, so `offset + max`
        // approaches zero at the tail.
        (offset + max_offset).abs() <= FOLLOW_RESUME_THRESHOLD
    }
}

/// Renders the latest feed snapshot as a virtualized list of rows.
pub struct MessageList {
    feed: FeedPhase,
    viewer: Viewer,
    item_sizes: Rc<Vec<Size<Pixels>>>,
    follow: FollowState,
    size_cache: HashMap<String, SizeCacheEntry>,
    content_width: Option<Pixels>,
}

impl MessageList {
    pub fn new(viewer_name: &str, _cx: &mut Context<Self>) -> Self {
        Self {
            feed: FeedPhase::Waiting,
            viewer: Viewer::new(viewer_name),
            item_sizes: Rc::new(Vec::new()),
            follow: FollowState::new(),
            size_cache: HashMap::new(),
            content_width: None,
        }
    }

    pub fn feed(&self) -> &FeedPhase {
        &self.feed
    }

    /// Replaces the visible list with a new snapshot, in delivery order.
    pub fn apply_snapshot(&mut self, messages: Vec<ChatMessage>, cx: &mut Context<Self>) {
        let grew = messages.len() > self.feed.rows().len();

        self.feed.apply_snapshot(messages);
        self.rebuild_item_sizes();

        if grew {
            self.follow.request_follow();
        }

        cx.notify();
    }

    /// Alignment is keyed off the viewer name, so a rename re-lays-out
    /// every row.
    pub fn set_viewer_name(&mut self, name: &str, cx: &mut Context<Self>) {
        if self.viewer.name() == name {
            return;
        }

        self.viewer.set_name(name);
        self.rebuild_item_sizes();
        cx.notify();
    }

    fn update_content_width(&mut self, cx: &mut Context<Self>) {
        let list_width = self.follow.bounds().size.width;
        if list_width <= Pixels::ZERO {
            return;
        }

        let next_content_width = max_pixels(px(1.), list_width - LIST_HORIZONTAL_PADDING * 2);
        let width_changed = self.content_width.is_none_or(|current| {
            (f32::from(current) - f32::from(next_content_width)).abs()
                > CONTENT_WIDTH_CHANGE_EPSILON
        });

        if width_changed {
            self.content_width = Some(next_content_width);

            // Cached measurements are width-dependent; force remeasure.
            for entry in self.size_cache.values_mut() {
                entry.measured = false;
            }

            self.rebuild_item_sizes();
            cx.notify();
        }
    }

    fn rebuild_item_sizes(&mut self) {
        let content_width = self.content_width.unwrap_or(DEFAULT_CONTENT_WIDTH);
        let rows = self.feed.rows();
        let mut active_ids = HashSet::with_capacity(rows.len());
        let mut sizes = Vec::with_capacity(rows.len());

        for message in rows {
            let alignment = self.viewer.alignment(message);
            let next_hash = layout_hash(message, alignment);
            let estimated_height = estimate_row_height(message, alignment, content_width);

            let entry = self
                .size_cache
                .entry(message.id.clone())
                .or_insert(SizeCacheEntry {
                    layout_hash: next_hash,
                    height: estimated_height,
                    measured: false,
                });

            // Cache entries stay stable by message id and invalidate only
            // when the row's layout inputs change.
            if entry.layout_hash != next_hash {
                entry.layout_hash = next_hash;
                entry.height = estimated_height;
                entry.measured = false;
            } else if !entry.measured {
                entry.height = estimated_height;
            }

            sizes.push(size(px(0.), entry.height));
            active_ids.insert(message.id.clone());
        }

        self.size_cache.retain(|id, _| active_ids.contains(id));
        self.item_sizes = Rc::new(sizes);
    }

    fn measure_visible_rows(
        &mut self,
        visible_range: Range<usize>,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) {
        if self.feed.rows().is_empty() {
            return;
        }

        let content_width = self.content_width.unwrap_or(DEFAULT_CONTENT_WIDTH);
        let available_space = size(
            AvailableSpace::Definite(content_width),
            AvailableSpace::MinContent,
        );
        let mut updated = false;

        for index in visible_range {
            let Some(message) = self.feed.rows().get(index).cloned() else {
                continue;
            };

            let alignment = self.viewer.alignment(&message);
            let next_hash = layout_hash(&message, alignment);
            let estimated_height = estimate_row_height(&message, alignment, content_width);

            {
                let entry = self
                    .size_cache
                    .entry(message.id.clone())
                    .or_insert(SizeCacheEntry {
                        layout_hash: next_hash,
                        height: estimated_height,
                        measured: false,
                    });

                if entry.layout_hash != next_hash {
                    entry.layout_hash = next_hash;
                    entry.height = estimated_height;
                    entry.measured = false;
                }
            }

            let mut row = self.render_message_row(&message, index, cx);
            let measured_height = row.layout_as_root(available_space, window, cx).height;
            let Some(entry) = self.size_cache.get_mut(&message.id) else {
                continue;
            };
            let height_changed = !entry.measured || pixels_changed(entry.height, measured_height);
            if height_changed {
                entry.height = measured_height;
                updated = true;
            }
            entry.measured = true;
        }

        if updated {
            self.rebuild_item_sizes();
            cx.notify();
        }
    }

    fn render_message_row(
        &self,
        message: &ChatMessage,
        _index: usize,
        cx: &mut Context<Self>,
    ) -> AnyElement {
        let theme = cx.theme();
        let content = if message.content.is_empty() {
            " ".to_string()
        } else {
            message.content.clone()
        };

        match self.viewer.alignment(message) {
            RowAlignment::Own => v_flex()
                .w_full()
                .items_end()
                .child(
                    div()
                        .max_w(BUBBLE_MAX_WIDTH)
                        .px(BUBBLE_PADDING_X)
                        .py(BUBBLE_PADDING_Y)
                        .rounded_lg()
                        .bg(theme.accent)
                        .text_color(theme.accent_foreground)
                        .child(Label::new(content).text_sm()),
                )
                .into_any_element(),
            RowAlignment::Other => h_flex()
                .w_full()
                .items_start()
                .gap(AVATAR_GAP)
                .child(
                    div()
                        .size(AVATAR_SIZE)
                        .flex_shrink_0()
                        .rounded_full()
                        .border_1()
                        .border_color(theme.border)
                        .bg(theme.muted)
                        .flex()
                        .items_center()
                        .justify_center()
                        .child(
                            Label::new(avatar_label(&message.author))
                                .text_sm()
                                .text_color(theme.muted_foreground),
                        ),
                )
                .child(
                    div()
                        .max_w(BUBBLE_MAX_WIDTH)
                        .px(BUBBLE_PADDING_X)
                        .py(BUBBLE_PADDING_Y)
                        .rounded_lg()
                        .bg(theme.muted)
                        .text_color(theme.foreground)
                        .child(Label::new(content).text_sm()),
                )
                .into_any_element(),
        }
    }
}

impl Render for MessageList {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        self.update_content_width(cx);
        self.follow.update();
        self.follow.apply_pending();

        v_flex().size_full().min_h_0().child(
            v_virtual_list(
                cx.entity().clone(),
                "message-list",
                self.item_sizes.clone(),
                |this, visible_range, window, cx| {
                    // Measure only visible rows so long feeds keep
                    // O(visible) layout work.
                    this.update_content_width(cx);
                    this.measure_visible_rows(visible_range.clone(), window, cx);
                    visible_range
                        .filter_map(|index| {
                            this.feed
                                .rows()
                                .get(index)
                                .cloned()
                                .map(|message| this.render_message_row(&message, index, cx))
                        })
                        .collect::<Vec<_>>()
                },
            )
            .size_full()
            .px_4()
            .py_3()
            .gap_4()
            .track_scroll(self.follow.handle()),
        )
    }
}

fn layout_hash(message: &ChatMessage, alignment: RowAlignment) -> u64 {
    let mut hasher = DefaultHasher::new();

    hasher.write(message.id.as_bytes());
    hasher.write_u8(match alignment {
        RowAlignment::Own => 0,
        RowAlignment::Other => 1,
    });
    hasher.write(message.author.as_bytes());
    hasher.write(message.content.as_bytes());
    hasher.finish()
}

fn estimate_row_height(
    message: &ChatMessage,
    alignment: RowAlignment,
    content_width: Pixels,
) -> Pixels {
    match alignment {
        RowAlignment::Own => {
            let bubble_width = min_pixels(content_width, BUBBLE_MAX_WIDTH);
            let text_width = max_pixels(px(1.), bubble_width - BUBBLE_PADDING_X * 2);
            estimate_text_height(&message.content, text_width) + BUBBLE_PADDING_Y * 2
        }
        RowAlignment::Other => {
            let available = max_pixels(px(1.), content_width - AVATAR_SIZE - AVATAR_GAP);
            let bubble_width = min_pixels(available, BUBBLE_MAX_WIDTH);
            let text_width = max_pixels(px(1.), bubble_width - BUBBLE_PADDING_X * 2);
            let bubble_height =
                estimate_text_height(&message.content, text_width) + BUBBLE_PADDING_Y * 2;

            // The avatar column sets a floor for short rows.
            max_pixels(bubble_height, AVATAR_SIZE)
        }
    }
}

fn estimate_text_height(content: &str, width: Pixels) -> Pixels {
    if content.is_empty() {
        return ESTIMATED_TEXT_LINE_HEIGHT;
    }

    let width_as_f32 = f32::from(width);
    let chars_per_line = (width_as_f32 / ESTIMATED_CHAR_WIDTH).floor().max(1.0) as usize;

    let mut line_count = 0usize;
    for line in content.lines() {
        let char_count = line.chars().count().max(1);
        line_count += char_count.div_ceil(chars_per_line);
    }

    if content.ends_with('\n') {
        line_count += 1;
    }

    ESTIMATED_TEXT_LINE_HEIGHT * line_count.max(1)
}

fn max_pixels(a: Pixels, b: Pixels) -> Pixels {
    if f32::from(a) >= f32::from(b) { a } else { b }
}

fn min_pixels(a: Pixels, b: Pixels) -> Pixels {
    if f32::from(a) <= f32::from(b) { a } else { b }
}

fn pixels_changed(a: Pixels, b: Pixels) -> bool {
    (f32::from(a) - f32::from(b)).abs() > 0.5
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowMetric {
    pub message_id: String,
    pub alignment: RowAlignment,
    pub estimated_height: f32,
    pub layout_hash: u64,
}

/// Pure projection of the rows the list would lay out, for tests and
/// diagnostics.
pub fn row_metrics(viewer: &Viewer, messages: &[ChatMessage], content_width: f32) -> Vec<RowMetric> {
    let bounded_width = px(content_width.max(1.0));

    messages
        .iter()
        .map(|message| {
            let alignment = viewer.alignment(message);
            RowMetric {
                message_id: message.id.clone(),
                alignment,
                estimated_height: f32::from(estimate_row_height(
                    message,
                    alignment,
                    bounded_width,
                )),
                layout_hash: layout_hash(message, alignment),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waiting_feed_produces_zero_rows() {
        let viewer = Viewer::new("A");
        let feed = FeedPhase::default();
        assert!(row_metrics(&viewer, feed.rows(), 680.0).is_empty());
    }

    #[test]
    fn own_rows_skip_the_avatar_floor() {
        let viewer = Viewer::new("A");
        let messages = vec![
            ChatMessage::new("1", "A", "hello"),
            ChatMessage::new("2", "B", "hi"),
        ];

        let metrics = row_metrics(&viewer, &messages, 680.0);
        assert_eq!(metrics[0].alignment, RowAlignment::Own);
        assert_eq!(metrics[1].alignment, RowAlignment::Other);
        // Short other-rows are padded up to the avatar height; own rows
        // are just the bubble.
        assert!(metrics[1].estimated_height >= f32::from(AVATAR_SIZE));
        assert!(metrics[0].estimated_height < metrics[1].estimated_height);
    }

    #[test]
    fn renaming_the_viewer_changes_row_layout_hashes() {
        let messages = vec![ChatMessage::new("1", "A", "hello")];

        let as_author = row_metrics(&Viewer::new("A"), &messages, 680.0);
        let as_stranger = row_metrics(&Viewer::new("Z"), &messages, 680.0);

        assert_eq!(as_author[0].alignment, RowAlignment::Own);
        assert_eq!(as_stranger[0].alignment, RowAlignment::Other);
        assert_ne!(as_author[0].layout_hash, as_stranger[0].layout_hash);
    }

    #[test]
    fn large_feed_fixture_keeps_row_metrics_deterministic() {
        let viewer = Viewer::new("viewer");
        let mut messages = (0..2_000)
            .map(|index| {
                let author = if index % 2 == 0 { "viewer" } else { "peer" };
                ChatMessage::new(
                    format!("m-{index}"),
                    author,
                    format!("message-{index}: virtualization fixture payload"),
                )
            })
            .collect::<Vec<_>>();

        let before = row_metrics(&viewer, &messages, 680.0);
        assert_eq!(before.len(), 2_000);
        assert!(before.iter().all(|metric| metric.estimated_height > 0.0));

        if let Some(last_message) = messages.last_mut() {
            // Tail-only mutation should invalidate only the final row hash.
            last_message.content.push_str(" [edited]");
        }

        let after = row_metrics(&viewer, &messages, 680.0);
        assert_eq!(after.len(), 2_000);

        let hashes_before = before.iter().map(|m| m.layout_hash).collect::<Vec<_>>();
        let hashes_after = after.iter().map(|m| m.layout_hash).collect::<Vec<_>>();
        assert_eq!(hashes_before[..1_999], hashes_after[..1_999]);
        assert_ne!(hashes_before[1_999], hashes_after[1_999]);
    }
}
