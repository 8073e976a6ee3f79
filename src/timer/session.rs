use crate::{
    tags::{merge_tags, parse_tags},
    validation::validate_entry_name,
};

/// Descriptive data attached to the running entry. None of it affects the timer itself.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EntryDetails {
    name: String,
    name_error: Option<String>,
    project_id: Option<String>,
    tags: Vec<String>,
    tag_input: String,
}

impl EntryDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stores the name even when it is invalid. The validation message is kept alongside and
    /// returned.
    pub fn set_name(&mut self, name: impl Into<String>) -> Option<&str> {
        self.name = name.into();
        self.name_error = validate_entry_name(&self.name);
        self.name_error.as_deref()
    }

    pub fn name_error(&self) -> Option<&str> {
        self.name_error.as_deref()
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    pub fn set_project(&mut self, project_id: Option<String>) {
        self.project_id = project_id.filter(|v| !v.trim().is_empty());
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn tag_input(&self) -> &str {
        &self.tag_input
    }

    pub fn set_tag_input(&mut self, input: impl Into<String>) {
        self.tag_input = input.into();
    }

    /// Moves whatever is in the tag buffer into the tag set and clears the buffer.
    pub fn commit_tags(&mut self) {
        let input = std::mem::take(&mut self.tag_input);
        merge_tags(&mut self.tags, parse_tags(&input));
    }

    pub fn remove_tag(&mut self, tag: &str) {
        self.tags.retain(|v| v != tag);
    }
}

#[cfg(test)]
mod tests {
    use super::EntryDetails;

    #[test]
    fn test_commit_tags_is_idempotent_and_case_insensitive() {
        let mut details = EntryDetails::new();
        details.set_tag_input("bar");
        details.commit_tags();

        details.set_tag_input("Foo, foo bar");
        details.commit_tags();
        assert_eq!(details.tags(), ["bar", "foo"]);
        assert_eq!(details.tag_input(), "");

        details.set_tag_input("FOO");
        details.commit_tags();
        assert_eq!(details.tags(), ["bar", "foo"]);
    }

    #[test]
    fn test_commit_blank_input_only_clears_buffer() {
        let mut details = EntryDetails::new();
        details.set_tag_input(" , ");
        details.commit_tags();
        assert!(details.tags().is_empty());
        assert_eq!(details.tag_input(), "");
    }

    #[test]
    fn test_remove_tag_exact_match() {
        let mut details = EntryDetails::new();
        details.set_tag_input("web design");
        details.commit_tags();
        details.remove_tag("Web");
        assert_eq!(details.tags(), ["web", "design"]);
        details.remove_tag("web");
        assert_eq!(details.tags(), ["design"]);
    }

    #[test]
    fn test_long_name_is_flagged_not_rejected() {
        let mut details = EntryDetails::new();
        let long = "x".repeat(81);
        assert!(details.set_name(long.clone()).is_some());
        assert_eq!(details.name(), long);
        assert_eq!(
            details.name_error(),
            Some("Name is too long (max 80 characters).")
        );

        assert!(details.set_name("x".repeat(80)).is_none());
        assert!(details.name_error().is_none());
    }

    #[test]
    fn test_project_association() {
        let mut details = EntryDetails::new();
        details.set_project(Some("p-1".into()));
        assert_eq!(details.project_id(), Some("p-1"));
        details.set_project(Some(" ".into()));
        assert_eq!(details.project_id(), None);
    }
}
