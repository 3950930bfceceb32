/// Core immutable message model.
///
/// Messages exist only as the server delivers them; the client never
/// edits, deletes, or reorders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: String,
    pub author: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(
        id: impl Into<String>,
        author: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            author: author.into(),
            content: content.into(),
        }
    }
}

/// Which side of the list a row lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowAlignment {
    /// Authored by the viewer; rendered flush right, no avatar.
    Own,
    /// Authored by anyone else; rendered flush left behind an avatar.
    Other,
}

/// The viewer's identity as far as this client knows it.
///
/// The display name doubles as the alignment key; there is no
/// authenticated identity. Rendering code only talks to this type, so a
/// real identity provider can replace it without touching row layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    name: String,
}

impl Viewer {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Exact string equality on the author name decides ownership.
    pub fn alignment(&self, message: &ChatMessage) -> RowAlignment {
        if message.author == self.name {
            RowAlignment::Own
        } else {
            RowAlignment::Other
        }
    }
}

/// Short avatar text for rows the viewer did not author: the first two
/// characters of the author's name, upper-cased. Shorter names yield a
/// shorter or empty label.
pub fn avatar_label(author: &str) -> String {
    author.chars().take(2).collect::<String>().to_uppercase()
}

/// Feed lifecycle as the list view sees it.
///
/// Every subscription event replaces the whole visible list; nothing is
/// merged or diffed client-side.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FeedPhase {
    /// No snapshot has arrived yet; the list renders nothing.
    #[default]
    Waiting,
    /// At least one snapshot arrived; the latest one is visible.
    Live(Vec<ChatMessage>),
}

impl FeedPhase {
    pub fn apply_snapshot(&mut self, messages: Vec<ChatMessage>) {
        *self = Self::Live(messages);
    }

    /// Rows to render: empty while waiting, the latest snapshot once live.
    pub fn rows(&self) -> &[ChatMessage] {
        match self {
            Self::Waiting => &[],
            Self::Live(messages) => messages,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewer_authored_rows_align_own() {
        let viewer = Viewer::new("A");
        let own = ChatMessage::new("1", "A", "hello");
        let other = ChatMessage::new("2", "B", "hi");

        assert_eq!(viewer.alignment(&own), RowAlignment::Own);
        assert_eq!(viewer.alignment(&other), RowAlignment::Other);
    }

    #[test]
    fn alignment_uses_exact_equality() {
        let viewer = Viewer::new("ann");
        assert_eq!(
            viewer.alignment(&ChatMessage::new("1", "Ann", "x")),
            RowAlignment::Other
        );
        assert_eq!(
            viewer.alignment(&ChatMessage::new("2", "ann ", "x")),
            RowAlignment::Other
        );
    }

    #[test]
    fn avatar_label_takes_two_uppercased_characters() {
        assert_eq!(avatar_label("bob"), "BO");
        assert_eq!(avatar_label("claire"), "CL");
    }

    #[test]
    fn avatar_label_handles_short_and_empty_names() {
        assert_eq!(avatar_label("B"), "B");
        assert_eq!(avatar_label(""), "");
    }

    #[test]
    fn avatar_label_respects_character_boundaries() {
        assert_eq!(avatar_label("émile"), "ÉM");
    }

    #[test]
    fn feed_starts_waiting_with_zero_rows() {
        let phase = FeedPhase::default();
        assert!(!phase.is_live());
        assert!(phase.rows().is_empty());
    }

    #[test]
    fn snapshots_replace_the_list_wholesale() {
        let mut phase = FeedPhase::default();

        phase.apply_snapshot(vec![ChatMessage::new("1", "A", "hello")]);
        assert_eq!(phase.rows().len(), 1);

        // A shorter follow-up snapshot wins outright; nothing is merged.
        phase.apply_snapshot(vec![ChatMessage::new("2", "B", "hi")]);
        assert_eq!(phase.rows(), [ChatMessage::new("2", "B", "hi")]);
        assert!(phase.is_live());
    }

    #[test]
    fn empty_snapshot_still_counts_as_live() {
        let mut phase = FeedPhase::default();
        phase.apply_snapshot(Vec::new());
        assert!(phase.is_live());
        assert!(phase.rows().is_empty());
    }
}
