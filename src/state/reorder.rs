/// Where the dragged entry lands relative to the hovered one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Placement {
    Above,
    Below,
}

impl Placement {
    /// Decide by the pointer against the target row's vertical midpoint.
    /// Exactly on the midpoint counts as below.
    pub fn from_pointer(pointer_y: f64, rect_top: f64, rect_height: f64) -> Self {
        let mid = rect_top + rect_height / 2.0;
        if pointer_y >= mid {
            Placement::Below
        } else {
            Placement::Above
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum DragPhase {
    Idle,
    Dragging { word: String },
    Hovering { word: String, target: String, placement: Placement },
    Persisting { order: Vec<String> },
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub(crate) enum DragError {
    #[error("a reorder is still being saved")]
    InFlight,
}

/// One drag gesture at a time; at most one reorder persisting per episode.
#[derive(Clone, Debug)]
pub(crate) struct ReorderEngine {
    phase: DragPhase,
}

impl Default for ReorderEngine {
    fn default() -> Self {
        Self {
            phase: DragPhase::Idle,
        }
    }
}

impl ReorderEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &DragPhase {
        &self.phase
    }

    pub fn is_persisting(&self) -> bool {
        matches!(self.phase, DragPhase::Persisting { .. })
    }

    pub fn dragged_word(&self) -> Option<&str> {
        match &self.phase {
            DragPhase::Dragging { word } | DragPhase::Hovering { word, .. } => Some(word),
            _ => None,
        }
    }

    pub fn begin(&mut self, word: &str) -> Result<(), DragError> {
        if self.is_persisting() {
            return Err(DragError::InFlight);
        }
        self.phase = DragPhase::Dragging {
            word: word.to_string(),
        };
        Ok(())
    }

    /// Hovering over the dragged entry itself clears the indicator.
    pub fn hover(&mut self, target: &str, placement: Placement) {
        let Some(word) = self.dragged_word().map(str::to_string) else {
            return;
        };
        self.phase = if word == target {
            DragPhase::Dragging { word }
        } else {
            DragPhase::Hovering {
                word,
                target: target.to_string(),
                placement,
            }
        };
    }

    /// Gesture ended without a valid drop.
    pub fn cancel(&mut self) {
        if !self.is_persisting() {
            self.phase = DragPhase::Idle;
        }
    }

    /// Drop on the hovered target. Returns the new full order, or `None` when
    /// the drop changes nothing (the engine is then back to idle).
    pub fn drop_on(
        &mut self,
        current: &[String],
        target: &str,
        placement: Placement,
    ) -> Option<Vec<String>> {
        let word = self.dragged_word()?.to_string();
        match compute_drop_order(current, &word, target, placement) {
            Some(order) => {
                self.phase = DragPhase::Persisting {
                    order: order.clone(),
                };
                Some(order)
            }
            None => {
                self.phase = DragPhase::Idle;
                None
            }
        }
    }

    pub fn finish(&mut self) {
        self.phase = DragPhase::Idle;
    }
}

/// Remove `dragged` and reinsert it directly above or below `target`.
pub(crate) fn compute_drop_order(
    current: &[String],
    dragged: &str,
    target: &str,
    placement: Placement,
) -> Option<Vec<String>> {
    if dragged == target {
        return None;
    }
    if !current.iter().any(|w| w == dragged) {
        return None;
    }

    let mut next: Vec<String> = current.iter().filter(|w| *w != dragged).cloned().collect();
    let tidx = next.iter().position(|w| w == target)?;
    let insert_idx = match placement {
        Placement::Above => tidx,
        Placement::Below => tidx + 1,
    };
    next.insert(insert_idx, dragged.to_string());

    if next == current {
        return None;
    }
    Some(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_placement_midpoint_tie_is_below() {
        assert_eq!(Placement::from_pointer(10.0, 0.0, 20.0), Placement::Below);
        assert_eq!(Placement::from_pointer(9.9, 0.0, 20.0), Placement::Above);
        assert_eq!(Placement::from_pointer(25.0, 0.0, 20.0), Placement::Below);
    }

    #[test]
    fn test_drag_fox_above_cat() {
        let current = words(&["cat", "dog", "fox"]);
        let order = compute_drop_order(&current, "fox", "cat", Placement::Above);
        assert_eq!(order, Some(words(&["fox", "cat", "dog"])));
    }

    #[test]
    fn test_drop_below_last() {
        let current = words(&["cat", "dog", "fox"]);
        let order = compute_drop_order(&current, "cat", "fox", Placement::Below);
        assert_eq!(order, Some(words(&["dog", "fox", "cat"])));
    }

    #[test]
    fn test_drop_on_self_or_unknown_is_noop() {
        let current = words(&["cat", "dog", "fox"]);
        assert_eq!(compute_drop_order(&current, "dog", "dog", Placement::Above), None);
        assert_eq!(compute_drop_order(&current, "owl", "dog", Placement::Above), None);
        assert_eq!(compute_drop_order(&current, "dog", "owl", Placement::Above), None);
    }

    #[test]
    fn test_drop_into_same_slot_is_noop() {
        let current = words(&["cat", "dog", "fox"]);
        // Dog below cat is where dog already is.
        assert_eq!(compute_drop_order(&current, "dog", "cat", Placement::Below), None);
        assert_eq!(compute_drop_order(&current, "dog", "fox", Placement::Above), None);
    }

    #[test]
    fn test_every_drop_point_keeps_a_permutation() {
        let current = words(&["a", "b", "c", "d", "e"]);
        for dragged in &current {
            for target in &current {
                for placement in [Placement::Above, Placement::Below] {
                    if let Some(order) = compute_drop_order(&current, dragged, target, placement) {
                        let mut sorted = order.clone();
                        sorted.sort();
                        assert_eq!(sorted, current);
                    }
                }
            }
        }
    }

    #[test]
    fn test_engine_state_machine() {
        let current = words(&["cat", "dog", "fox"]);
        let mut engine = ReorderEngine::new();
        assert_eq!(engine.phase(), &DragPhase::Idle);

        engine.begin("fox").expect("idle engine accepts a gesture");
        engine.hover("fox", Placement::Above);
        assert_eq!(
            engine.phase(),
            &DragPhase::Dragging {
                word: "fox".to_string()
            }
        );

        engine.hover("cat", Placement::Above);
        assert_eq!(
            engine.phase(),
            &DragPhase::Hovering {
                word: "fox".to_string(),
                target: "cat".to_string(),
                placement: Placement::Above,
            }
        );

        let order = engine.drop_on(&current, "cat", Placement::Above);
        assert_eq!(order, Some(words(&["fox", "cat", "dog"])));
        assert!(engine.is_persisting());

        assert_eq!(engine.begin("dog"), Err(DragError::InFlight));
        engine.cancel();
        assert!(engine.is_persisting());

        engine.finish();
        assert_eq!(engine.phase(), &DragPhase::Idle);
    }

    #[test]
    fn test_engine_cancel_and_self_drop_return_to_idle() {
        let current = words(&["cat", "dog"]);
        let mut engine = ReorderEngine::new();

        engine.begin("cat").expect("begin");
        engine.cancel();
        assert_eq!(engine.phase(), &DragPhase::Idle);

        engine.begin("cat").expect("begin");
        assert_eq!(engine.drop_on(&current, "cat", Placement::Below), None);
        assert_eq!(engine.phase(), &DragPhase::Idle);

        // Drop without a gesture does nothing.
        assert_eq!(engine.drop_on(&current, "dog", Placement::Below), None);
    }
}
