//! Recover evaluation events from log lines
//!
//! Two line shapes are recognized anywhere inside a message, so timestamps or
//! level prefixes added by the log formatter do not matter:
//!
//! ```text
//! The best score is updated <old> -> <new>
//! evaluation episode <i> length:<L> R:<reward> IoU:<iou> Max_IoU:<max_iou>
//! ```
//!
//! Fields are whitespace-delimited tokens. Anything else, including a recognized
//! shape with a malformed number, is not a match.

use std::str::FromStr;

use super::event::{EpisodeRecord, EvaluationEvent};

const NEW_BEST_MARKER: &str = "The best score is updated ";
const EPISODE_MARKER: &str = "evaluation episode ";

/// Parse one log message
///
/// Returns `None` when the message carries no evaluation event.
///
/// # Example
///
/// ```rust
/// use ml_textloc::metrics::{parse_line, EvaluationEvent};
///
/// let event = parse_line("The best score is updated 10.0 -> 12.5");
/// assert_eq!(event, Some(EvaluationEvent::NewBest(12.5)));
/// assert_eq!(parse_line("outdir:results step:10 episode:0 R:1"), None);
/// ```
pub fn parse_line(line: &str) -> Option<EvaluationEvent> {
    parse_new_best(line).or_else(|| parse_episode(line))
}

fn parse_new_best(line: &str) -> Option<EvaluationEvent> {
    let rest = after(line, NEW_BEST_MARKER)?;
    let mut tokens = rest.split_whitespace();
    let _previous = tokens.next()?;
    if tokens.next()? != "->" {
        return None;
    }
    let score = number(tokens.next()?)?;
    Some(EvaluationEvent::NewBest(score))
}

fn parse_episode(line: &str) -> Option<EvaluationEvent> {
    let rest = after(line, EPISODE_MARKER)?;
    let mut tokens = rest.split_whitespace();

    let index = number(tokens.next()?)?;
    let length = field(tokens.next()?, "length:")?;
    let reward = field(tokens.next()?, "R:")?;
    let iou = field(tokens.next()?, "IoU:")?;
    let max_iou = field(tokens.next()?, "Max_IoU:")?;

    Some(EvaluationEvent::EpisodeResult(EpisodeRecord {
        index,
        length,
        reward,
        iou,
        max_iou,
    }))
}

/// Text following the first occurrence of `marker`
fn after<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    line.find(marker).map(|pos| &line[pos + marker.len()..])
}

/// Parse a `<label><value>` token
fn field<T: FromStr>(token: &str, label: &str) -> Option<T> {
    number(token.strip_prefix(label)?)
}

fn number<T: FromStr>(token: &str) -> Option<T> {
    token.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_episode_line() {
        let event = parse_line("evaluation episode 3 length:12 R:4.5 IoU:0.82 Max_IoU:0.91");
        assert_eq!(
            event,
            Some(EvaluationEvent::EpisodeResult(EpisodeRecord {
                index: 3,
                length: 12,
                reward: 4.5,
                iou: 0.82,
                max_iou: 0.91,
            }))
        );
    }

    #[test]
    fn test_parse_new_best_line() {
        assert_eq!(
            parse_line("The best score is updated 10.0 -> 12.5"),
            Some(EvaluationEvent::NewBest(12.5))
        );
    }

    #[test]
    fn test_parse_first_new_best() {
        assert_eq!(
            parse_line("The best score is updated -inf -> -3"),
            Some(EvaluationEvent::NewBest(-3.0))
        );
    }

    #[test]
    fn test_unrelated_line_is_no_match() {
        assert_eq!(parse_line("statistics: average_q=0.3 average_loss=0.01"), None);
        assert_eq!(parse_line(""), None);
    }

    #[test]
    fn test_prefixed_line_matches() {
        let line = "2026-10-18T10:00:00Z  INFO ml_textloc::training::evaluation: \
                    evaluation episode 0 length:5 R:-2 IoU:0 Max_IoU:0.75";
        match parse_line(line) {
            Some(EvaluationEvent::EpisodeResult(record)) => {
                assert_eq!(record.index, 0);
                assert_eq!(record.length, 5);
                assert_eq!(record.reward, -2.0);
                assert_eq!(record.iou, 0.0);
                assert_eq!(record.max_iou, 0.75);
            }
            other => panic!("expected an episode result, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_numbers_are_no_match() {
        assert_eq!(
            parse_line("evaluation episode x length:12 R:4.5 IoU:0.82 Max_IoU:0.91"),
            None
        );
        assert_eq!(
            parse_line("evaluation episode 1 length:1.5 R:4.5 IoU:0.82 Max_IoU:0.91"),
            None
        );
        assert_eq!(parse_line("The best score is updated 1 -> abc"), None);
    }

    #[test]
    fn test_truncated_line_is_no_match() {
        assert_eq!(parse_line("evaluation episode 1 length:3 R:4.5"), None);
        assert_eq!(parse_line("The best score is updated 1"), None);
    }

    #[test]
    fn test_formatted_record_parses_back() {
        let record = EpisodeRecord {
            index: 9,
            length: 100,
            reward: -37.0,
            iou: 0.0,
            max_iou: 0.6180339887498949,
        };
        assert_eq!(
            parse_line(&record.to_string()),
            Some(EvaluationEvent::EpisodeResult(record))
        );
    }

    #[test]
    fn test_fields_split_on_any_whitespace() {
        assert_eq!(
            parse_line("evaluation episode 2  length:7\tR:1.5 IoU:0.5   Max_IoU:0.5\r"),
            Some(EvaluationEvent::EpisodeResult(EpisodeRecord {
                index: 2,
                length: 7,
                reward: 1.5,
                iou: 0.5,
                max_iou: 0.5,
            }))
        );
        assert_eq!(
            parse_line("The best score is updated 1.0\t->  2.0"),
            Some(EvaluationEvent::NewBest(2.0))
        );
    }
}
