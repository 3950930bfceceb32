use gpui::*;
use gpui_component::{
    ActiveTheme, IconName, Sizable,
    button::{Button, ButtonVariants},
    h_flex,
    input::{Input, InputEvent, InputState},
};

use crate::chat::events::{NameChanged, Submit};

const NAME_FIELD_WIDTH: Pixels = px(140.);

/// Client-local editable state behind the two composer fields.
///
/// The send guard is a raw length check: whitespace counts as content.
/// Content clears after every send attempt whether or not the guard
/// passed, so sending an empty draft is an idempotent no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    author: String,
    content: String,
}

impl Draft {
    pub fn new(author: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            content: String::new(),
        }
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Replaces the author, leaving the draft content untouched.
    pub fn set_author(&mut self, author: impl Into<String>) {
        self.author = author.into();
    }

    /// Replaces the draft content, leaving the author untouched.
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    /// Clears the content and, when it was non-empty, returns the pair
    /// for exactly one outbound post.
    pub fn take_send(&mut self) -> Option<Submit> {
        let content = std::mem::take(&mut self.content);
        if content.is_empty() {
            return None;
        }

        Some(Submit::new(self.author.clone(), content))
    }
}

/// Name + content inputs with a send control. Enter in the content field
/// is equivalent to the send button.
pub struct Composer {
    draft: Draft,
    name_input: Entity<InputState>,
    content_input: Entity<InputState>,
}

impl EventEmitter<Submit> for Composer {}
impl EventEmitter<NameChanged> for Composer {}

impl Composer {
    pub fn new(initial_name: &str, window: &mut Window, cx: &mut Context<Self>) -> Self {
        let name_input = cx.new(|cx| InputState::new(window, cx).placeholder("Name"));
        name_input.update(cx, |state, cx| {
            state.set_value(initial_name.to_string(), window, cx);
        });

        let content_input =
            cx.new(|cx| InputState::new(window, cx).placeholder("Say something..."));

        cx.subscribe_in(
            &name_input,
            window,
            |this, _, _event: &InputEvent, _window, cx| {
                let name = this.name_input.read(cx).value().to_string();
                if name != this.draft.author() {
                    this.draft.set_author(name.clone());
                    cx.emit(NameChanged { name });
                }
            },
        )
        .detach();

        cx.subscribe_in(
            &content_input,
            window,
            |this, _, event: &InputEvent, window, cx| {
                if let InputEvent::PressEnter { .. } = event {
                    this.handle_send(window, cx);
                } else {
                    let content = this.content_input.read(cx).value().to_string();
                    this.draft.set_content(content);
                }
            },
        )
        .detach();

        Self {
            draft: Draft::new(initial_name),
            name_input,
            content_input,
        }
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    fn handle_send(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        // The input can be ahead of the last change event; read it before
        // deciding whether the guard passes.
        let content = self.content_input.read(cx).value().to_string();
        self.draft.set_content(content);

        let submit = self.draft.take_send();

        // The visible field clears regardless of the guard outcome.
        self.content_input.update(cx, |state, cx| {
            state.set_value("", window, cx);
        });

        if let Some(submit) = submit {
            cx.emit(submit);
        }
    }
}

impl Render for Composer {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();

        h_flex()
            .w_full()
            .items_center()
            .gap_2()
            .p_3()
            .bg(theme.background)
            .child(
                div()
                    .w(NAME_FIELD_WIDTH)
                    .flex_shrink_0()
                    .child(Input::new(&self.name_input).w_full()),
            )
            .child(
                div()
                    .flex_1()
                    .min_w_0()
                    .child(Input::new(&self.content_input).w_full()),
            )
            .child(
                Button::new("send")
                    .small()
                    .primary()
                    .icon(IconName::ArrowUp)
                    .child("Send")
                    .on_click(cx.listener(|this, _, window, cx| {
                        this.handle_send(window, cx);
                    })),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_draft_does_not_send_and_stays_empty() {
        let mut draft = Draft::new("A");
        assert_eq!(draft.take_send(), None);
        assert_eq!(draft.content(), "");
    }

    #[test]
    fn non_empty_draft_sends_exactly_once_and_clears() {
        let mut draft = Draft::new("A");
        draft.set_content("hi");

        assert_eq!(draft.take_send(), Some(Submit::new("A", "hi")));
        assert_eq!(draft.content(), "");
        // The content was consumed; a repeat attempt is a no-op.
        assert_eq!(draft.take_send(), None);
    }

    #[test]
    fn whitespace_counts_as_content() {
        let mut draft = Draft::new("A");
        draft.set_content("   ");

        let submit = draft.take_send().expect("whitespace passes the guard");
        assert_eq!(submit.content, "   ");
    }

    #[test]
    fn author_and_content_edits_are_independent() {
        let mut draft = Draft::new("Name");
        draft.set_content("hello");
        draft.set_author("Ann");
        assert_eq!(draft.content(), "hello");

        draft.set_content("hello again");
        assert_eq!(draft.author(), "Ann");
    }

    #[test]
    fn send_uses_the_author_at_send_time() {
        let mut draft = Draft::new("Name");
        draft.set_content("hi");
        draft.set_author("Bea");

        let submit = draft.take_send().expect("guard passes");
        assert_eq!(submit.author, "Bea");
    }
}
