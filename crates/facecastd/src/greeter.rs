use facecast_core::UNKNOWN_LABEL;

/// Per-connection memory of the last name announced to the client.
#[derive(Debug, Default)]
pub struct Greeter {
    last_greeted: Option<String>,
}

impl Greeter {
    /// Decide whether `label` (the last face of a frame) should be announced.
    ///
    /// Returns the name to announce, or `None` for no face, `Unknown`, or a
    /// repeat of the previous announcement.
    pub fn observe(&mut self, label: Option<&str>) -> Option<String> {
        let name = label?;
        if name == UNKNOWN_LABEL || self.last_greeted.as_deref() == Some(name) {
            return None;
        }
        self.last_greeted = Some(name.to_string());
        Some(name.to_string())
    }

    pub fn last_greeted(&self) -> Option<&str> {
        self.last_greeted.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_name_is_announced() {
        let mut g = Greeter::default();
        assert_eq!(g.observe(Some("alice")).as_deref(), Some("alice"));
        assert_eq!(g.last_greeted(), Some("alice"));
    }

    #[test]
    fn test_repeat_is_suppressed() {
        let mut g = Greeter::default();
        assert!(g.observe(Some("alice")).is_some());
        assert!(g.observe(Some("alice")).is_none());
    }

    #[test]
    fn test_unknown_and_empty_frames_do_not_announce_or_reset() {
        let mut g = Greeter::default();
        assert!(g.observe(Some(UNKNOWN_LABEL)).is_none());
        assert!(g.observe(None).is_none());
        assert!(g.observe(Some("alice")).is_some());
        assert!(g.observe(Some(UNKNOWN_LABEL)).is_none());
        assert!(g.observe(None).is_none());
        assert!(g.observe(Some("alice")).is_none());
    }

    #[test]
    fn test_new_name_is_announced() {
        let mut g = Greeter::default();
        assert!(g.observe(Some("alice")).is_some());
        assert_eq!(g.observe(Some("bob")).as_deref(), Some("bob"));
        assert_eq!(g.observe(Some("alice")).as_deref(), Some("alice"));
    }
}
