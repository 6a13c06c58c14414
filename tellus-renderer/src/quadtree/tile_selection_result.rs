/// What the selection pass decided about a tile the last time it visited it.
/// The kick bit marks a tile whose earlier decision was retracted later in
/// the same traversal; a kicked tile is not on screen.
#[allow(non_camel_case_types)]
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileSelectionResult {
    #[default]
    NONE = 0,
    CULLED = 1,
    RENDERED = 2,
    REFINED = 3,
    RENDERED_AND_KICKED = 2 | 4,
    REFINED_AND_KICKED = 3 | 4,
    /// Culled by the frustum, but its data is still wanted (e.g. it supplies
    /// heights for a visible descendant).
    CULLED_BUT_NEEDED = 1 | 8,
}

impl TileSelectionResult {
    pub fn was_kicked(&self) -> bool {
        return (*self as u8) & 4 != 0;
    }

    /// The decision with the kick bit stripped.
    pub fn original_result(&self) -> TileSelectionResult {
        return Self::from_u8((*self as u8) & 3);
    }

    pub fn kick(&self) -> TileSelectionResult {
        match self.original_result() {
            TileSelectionResult::RENDERED => TileSelectionResult::RENDERED_AND_KICKED,
            TileSelectionResult::REFINED => TileSelectionResult::REFINED_AND_KICKED,
            other => other,
        }
    }

    fn from_u8(value: u8) -> TileSelectionResult {
        match value {
            1 => TileSelectionResult::CULLED,
            2 => TileSelectionResult::RENDERED,
            3 => TileSelectionResult::REFINED,
            _ => TileSelectionResult::NONE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kick_preserves_the_original_decision() {
        let rendered = TileSelectionResult::RENDERED;
        let kicked = rendered.kick();
        assert_eq!(kicked, TileSelectionResult::RENDERED_AND_KICKED);
        assert!(kicked.was_kicked());
        assert_eq!(kicked.original_result(), TileSelectionResult::RENDERED);
        assert!(!rendered.was_kicked());
    }

    #[test]
    fn culled_but_needed_is_a_kind_of_culled() {
        let result = TileSelectionResult::CULLED_BUT_NEEDED;
        assert_eq!(result.original_result(), TileSelectionResult::CULLED);
        assert!(!result.was_kicked());
    }
}
