//! Nested conditional directives.
//!
//! One [`ConditionalStack`] exists per file being interpreted. Frame 0 is
//! the file itself and is never suppressed. `active` is the deepest frame
//! whose ancestors are all enabled; conditions of frames below a suppressed
//! ancestor are never evaluated.

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Default)]
struct Frame {
    suppressed: bool,
    branch_taken: bool,
    else_seen: bool,
}

#[derive(Debug, Clone)]
pub struct ConditionalStack {
    frames: Vec<Frame>,
    active: usize,
}

impl Default for ConditionalStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ConditionalStack {
    pub fn new() -> Self {
        Self { frames: vec![Frame::default()], active: 0 }
    }

    /// Number of open conditional blocks.
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// True when lines at the current position are emitted.
    pub fn is_emitting(&self) -> bool {
        self.active == self.depth() && !self.frames[self.active].suppressed
    }

    /// Opens a block. `condition` is only evaluated when the enclosing block
    /// is emitting; an evaluation error counts as a false condition.
    pub fn push_if<F>(&mut self, condition: F) -> Result<()>
    where
        F: FnOnce() -> Result<bool>,
    {
        let enclosing = self.is_emitting();
        self.frames.push(Frame { suppressed: true, branch_taken: false, else_seen: false });
        if !enclosing {
            return Ok(());
        }

        self.active = self.depth();
        let result = condition();
        let taken = *result.as_ref().unwrap_or(&false);
        let frame = self.current_mut();
        frame.suppressed = !taken;
        frame.branch_taken = taken;
        result.map(|_| ())
    }

    /// Switches to an `elsif` branch of the innermost block.
    pub fn elsif<F>(&mut self, directive: &str, condition: F) -> Result<()>
    where
        F: FnOnce() -> Result<bool>,
    {
        if self.depth() == 0 {
            return Err(Error::NoPrecedingIfError { directive: directive.to_string() });
        }
        if self.current().else_seen {
            return Err(Error::ElseAlreadySeenError { directive: directive.to_string() });
        }
        if self.active != self.depth() {
            return Ok(());
        }
        if self.current().branch_taken {
            self.current_mut().suppressed = true;
            return Ok(());
        }

        let result = condition();
        let taken = *result.as_ref().unwrap_or(&false);
        let frame = self.current_mut();
        frame.suppressed = !taken;
        frame.branch_taken = taken;
        result.map(|_| ())
    }

    /// Switches to the `else` branch of the innermost block.
    pub fn otherwise(&mut self, directive: &str) -> Result<()> {
        if self.depth() == 0 {
            return Err(Error::NoPrecedingIfError { directive: directive.to_string() });
        }
        if self.current().else_seen {
            return Err(Error::ElseAlreadySeenError { directive: directive.to_string() });
        }
        let tracked = self.active == self.depth();
        let frame = self.current_mut();
        frame.else_seen = true;
        if tracked {
            frame.suppressed = frame.branch_taken;
            frame.branch_taken = true;
        }
        Ok(())
    }

    /// Closes the innermost block.
    pub fn endif(&mut self, directive: &str) -> Result<()> {
        if self.depth() == 0 {
            return Err(Error::UnmatchedEndifError { directive: directive.to_string() });
        }
        if self.active == self.depth() {
            self.active -= 1;
        }
        self.frames.pop();
        Ok(())
    }

    fn current(&self) -> &Frame {
        &self.frames[self.depth()]
    }

    fn current_mut(&mut self) -> &mut Frame {
        let depth = self.depth();
        &mut self.frames[depth]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yes() -> Result<bool> {
        Ok(true)
    }

    fn no() -> Result<bool> {
        Ok(false)
    }

    #[test]
    fn test_if_else() {
        let mut stack = ConditionalStack::new();
        stack.push_if(no).unwrap();
        assert!(!stack.is_emitting());
        stack.otherwise("else").unwrap();
        assert!(stack.is_emitting());
        stack.endif("endif").unwrap();
        assert!(stack.is_emitting());
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn test_exactly_one_branch() {
        let mut stack = ConditionalStack::new();
        let mut emitted = Vec::new();
        stack.push_if(no).unwrap();
        emitted.push(stack.is_emitting());
        stack.elsif("elsif", yes).unwrap();
        emitted.push(stack.is_emitting());
        stack.elsif("elsif", yes).unwrap();
        emitted.push(stack.is_emitting());
        stack.otherwise("else").unwrap();
        emitted.push(stack.is_emitting());
        stack.endif("endif").unwrap();
        assert_eq!(emitted, vec![false, true, false, false]);
    }

    #[test]
    fn test_nested_in_suppressed_block() {
        let mut stack = ConditionalStack::new();
        stack.push_if(no).unwrap();
        stack.push_if(|| panic!("condition evaluated in suppressed block")).unwrap();
        assert!(!stack.is_emitting());
        stack.otherwise("else").unwrap();
        assert!(!stack.is_emitting());
        stack.endif("endif").unwrap();
        assert!(!stack.is_emitting());
        stack.otherwise("else").unwrap();
        assert!(stack.is_emitting());
        stack.endif("endif").unwrap();
        assert!(stack.is_emitting());
    }

    #[test]
    fn test_misplaced_directives() {
        let mut stack = ConditionalStack::new();
        assert!(matches!(stack.endif("endif"), Err(Error::UnmatchedEndifError { .. })));
        assert!(matches!(stack.otherwise("else"), Err(Error::NoPrecedingIfError { .. })));
        assert!(matches!(stack.elsif("elsif", yes), Err(Error::NoPrecedingIfError { .. })));
        assert_eq!(stack.depth(), 0);
        assert!(stack.is_emitting());

        stack.push_if(yes).unwrap();
        stack.otherwise("else").unwrap();
        assert!(matches!(stack.otherwise("else"), Err(Error::ElseAlreadySeenError { .. })));
    }

    #[test]
    fn test_condition_error_counts_as_false() {
        let mut stack = ConditionalStack::new();
        let result = stack.push_if(|| {
            Err(Error::UnknownComparisonError { condition: "a < b".to_string() })
        });
        assert!(result.is_err());
        assert_eq!(stack.depth(), 1);
        assert!(!stack.is_emitting());
        stack.otherwise("else").unwrap();
        assert!(stack.is_emitting());
    }
}
