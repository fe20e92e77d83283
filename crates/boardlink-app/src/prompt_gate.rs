//! Prompt gate: decides when the host should ask the user to pick or
//! identify a board
//!
//! Prompts are edge-triggered. The ambiguity flag only prompts when it
//! turns on, so re-emitted feeds with the same situation stay silent.

use boardlink_core::PromptData;

/// What one reconciliation tick observed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptSignal {
    /// Current value of `manyBoardsMatchMetadata`
    pub many_boards_match: bool,

    /// New candidates arrived and none could be chosen automatically
    pub unresolved_candidates: bool,

    /// A single new board arrived that the agent could not identify
    pub identify: Option<PromptData>,

    /// A bypass window or the user preference swallowed this tick
    pub suppressed: bool,
}

/// Outcome of [`PromptGate::evaluate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptDecision {
    Stay,
    /// Ask the user; data is present when a specific port needs identifying
    Prompt(Option<PromptData>),
}

/// Edge memory for the ambiguity flag
#[derive(Debug, Clone, Default)]
pub struct PromptGate {
    many_was_set: bool,
}

impl PromptGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide on a tick; the edge memory advances even when suppressed
    pub fn evaluate(&mut self, signal: PromptSignal) -> PromptDecision {
        let rising = signal.many_boards_match && !self.many_was_set;
        self.many_was_set = signal.many_boards_match;

        if signal.suppressed {
            return PromptDecision::Stay;
        }
        if let Some(data) = signal.identify {
            return PromptDecision::Prompt(Some(data));
        }
        if rising || signal.unresolved_candidates {
            return PromptDecision::Prompt(None);
        }
        PromptDecision::Stay
    }

    pub fn reset(&mut self) {
        self.many_was_set = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn many(value: bool) -> PromptSignal {
        PromptSignal {
            many_boards_match: value,
            ..Default::default()
        }
    }

    #[test]
    fn test_many_prompts_on_rising_edge_only() {
        let mut gate = PromptGate::new();
        assert_eq!(gate.evaluate(many(true)), PromptDecision::Prompt(None));
        assert_eq!(gate.evaluate(many(true)), PromptDecision::Stay);
        assert_eq!(gate.evaluate(many(false)), PromptDecision::Stay);
        assert_eq!(gate.evaluate(many(true)), PromptDecision::Prompt(None));
    }

    #[test]
    fn test_suppressed_tick_consumes_the_edge() {
        let mut gate = PromptGate::new();
        let signal = PromptSignal {
            suppressed: true,
            ..many(true)
        };
        assert_eq!(gate.evaluate(signal), PromptDecision::Stay);
        assert_eq!(gate.evaluate(many(true)), PromptDecision::Stay);
    }

    #[test]
    fn test_identify_carries_prompt_data() {
        let mut gate = PromptGate::new();
        let data = PromptData {
            port_board_id: "/dev/ttyUSB0-0x7523-0x1a86".to_string(),
            port_name: "/dev/ttyUSB0".to_string(),
        };
        let signal = PromptSignal {
            identify: Some(data.clone()),
            ..Default::default()
        };
        assert_eq!(gate.evaluate(signal), PromptDecision::Prompt(Some(data)));
    }

    #[test]
    fn test_unresolved_candidates_prompt() {
        let mut gate = PromptGate::new();
        let signal = PromptSignal {
            unresolved_candidates: true,
            ..Default::default()
        };
        assert_eq!(gate.evaluate(signal), PromptDecision::Prompt(None));
    }

    #[test]
    fn test_reset_forgets_edge() {
        let mut gate = PromptGate::new();
        gate.evaluate(many(true));
        gate.reset();
        assert_eq!(gate.evaluate(many(true)), PromptDecision::Prompt(None));
    }
}
