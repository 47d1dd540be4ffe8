use serde::{Deserialize, Serialize};

/// Stopping configuration for an adaptive session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopRule {
    pub min_questions: u32,
    pub max_questions: u32,
    pub target_standard_error: f64,
}

/// Why a session stopped. Bank exhaustion is decided by the caller when
/// selection returns no candidate; it is carried here so the reason lands
/// on the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    MaxQuestions,
    PrecisionReached,
    BankExhausted,
    EarlyCompletion,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Termination {
    Continue,
    Stop(StopReason),
}

/// Evaluate the stopping rules after an answer has been recorded.
#[must_use]
pub fn evaluate(answered: u32, standard_error: Option<f64>, rule: &StopRule) -> Termination {
    if answered >= rule.max_questions {
        return Termination::Stop(StopReason::MaxQuestions);
    }
    if answered >= rule.min_questions {
        if let Some(se) = standard_error {
            if se <= rule.target_standard_error {
                return Termination::Stop(StopReason::PrecisionReached);
            }
        }
    }
    Termination::Continue
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULE: StopRule = StopRule {
        min_questions: 5,
        max_questions: 25,
        target_standard_error: 0.3,
    };

    #[test]
    fn continues_below_minimum_even_when_precise() {
        assert_eq!(evaluate(4, Some(0.1), &RULE), Termination::Continue);
    }

    #[test]
    fn stops_on_precision_after_minimum() {
        assert_eq!(evaluate(5, Some(0.3), &RULE), Termination::Stop(StopReason::PrecisionReached));
        assert_eq!(evaluate(5, Some(0.31), &RULE), Termination::Continue);
    }

    #[test]
    fn stops_at_maximum_regardless_of_precision() {
        assert_eq!(evaluate(25, Some(0.9), &RULE), Termination::Stop(StopReason::MaxQuestions));
        assert_eq!(evaluate(30, None, &RULE), Termination::Stop(StopReason::MaxQuestions));
    }

    #[test]
    fn fixed_length_session_stops_exactly_at_n() {
        let fixed = StopRule {
            min_questions: 8,
            max_questions: 8,
            target_standard_error: 0.3,
        };
        for answered in 0..8 {
            assert_eq!(evaluate(answered, Some(0.05), &fixed), Termination::Continue);
        }
        assert_eq!(evaluate(8, Some(0.9), &fixed), Termination::Stop(StopReason::MaxQuestions));
    }

    #[test]
    fn missing_standard_error_never_stops_early() {
        assert_eq!(evaluate(10, None, &RULE), Termination::Continue);
    }
}
