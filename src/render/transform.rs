//! Composed transform stack for the renderer.
//!
//! The stack always holds an identity sentinel at the bottom. Pushing
//! composes the new transform onto the current top so the device context can
//! be handed a single absolute matrix; popping restores the previous
//! composition exactly. Popping the sentinel is a programming error and
//! panics rather than leaving the renderer with a corrupt transform.

use kurbo::Affine;

#[derive(Debug, Clone)]
pub struct TransformStack {
    stack: Vec<Affine>,
}

impl TransformStack {
    pub fn new() -> Self {
        Self {
            stack: vec![Affine::IDENTITY],
        }
    }

    /// Composes `transform` onto the current top and returns the new
    /// absolute transform.
    pub fn push(&mut self, transform: Affine) -> Affine {
        let composed = self.current() * transform;
        self.stack.push(composed);
        composed
    }

    /// Drops the top entry and returns the restored absolute transform.
    ///
    /// # Panics
    ///
    /// Panics on an unbalanced pop that would remove the identity sentinel.
    pub fn pop(&mut self) -> Affine {
        assert!(
            self.stack.len() > 1,
            "unbalanced pop on the transform stack"
        );
        self.stack.pop();
        self.current()
    }

    /// Current absolute transform.
    pub fn current(&self) -> Affine {
        *self
            .stack
            .last()
            .expect("transform stack holds an identity sentinel")
    }

    /// Unwinds everything back to the identity sentinel.
    pub fn reset(&mut self) {
        self.stack.clear();
        self.stack.push(Affine::IDENTITY);
    }
}

impl Default for TransformStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::{Affine, Point};

    #[test]
    fn starts_at_identity() {
        let stack = TransformStack::new();
        assert_eq!(stack.current(), Affine::IDENTITY);
    }

    #[test]
    fn sequential_pushes_match_single_composition() {
        let translate = Affine::translate((10.0, -28.0));
        let scale = Affine::scale(0.5);

        let mut stack = TransformStack::new();
        stack.push(translate);
        let nested = stack.push(scale);

        let point = Point::new(3.0, 7.0);
        assert_eq!(nested * point, (translate * scale) * point);
    }

    #[test]
    fn pop_restores_previous_top_exactly() {
        let mut stack = TransformStack::new();
        let first = stack.push(Affine::rotate(0.3) * Affine::translate((1.0, 2.0)));
        stack.push(Affine::scale(1.7));

        let restored = stack.pop();
        assert_eq!(restored.as_coeffs(), first.as_coeffs());
    }

    #[test]
    fn reset_leaves_exactly_the_sentinel() {
        let mut stack = TransformStack::new();
        stack.push(Affine::scale(2.0));
        stack.push(Affine::translate((5.0, 5.0)));
        stack.reset();

        assert_eq!(stack.current(), Affine::IDENTITY);
        // The sentinel survives a reset; a pop would still be unbalanced.
        assert_eq!(stack.stack.len(), 1);
    }

    #[test]
    fn reset_clears_a_partially_built_frame() {
        let mut stack = TransformStack::new();
        stack.push(Affine::translate((0.0, 33.0)));
        stack.push(Affine::scale(0.5));

        // The frame was abandoned mid-way; the next one starts from the
        // sentinel as if the unbalanced pushes never happened.
        stack.reset();
        let next = stack.push(Affine::translate((4.0, 0.0)));
        assert_eq!(next, Affine::translate((4.0, 0.0)));
    }

    #[test]
    #[should_panic(expected = "unbalanced pop")]
    fn popping_the_sentinel_panics() {
        let mut stack = TransformStack::new();
        stack.pop();
    }

    #[test]
    #[should_panic(expected = "unbalanced pop")]
    fn pop_past_pushed_entries_panics() {
        let mut stack = TransformStack::new();
        stack.push(Affine::scale(2.0));
        stack.pop();
        stack.pop();
    }
}
