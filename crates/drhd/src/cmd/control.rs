use std::fmt;

use drhd_driver::HdmiMatrix;

use crate::cmd::{output_label, ControlArgs};
use crate::exit::{driver_error, CliError, CliResult, SUCCESS};
use crate::output::{print_routes, OutputFormat, Route};

const ALL_OUTPUTS: char = '*';

/// Output side of one `O:I` mapping group.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MapTarget {
    All,
    Output(u16),
}

/// One `O:I` mapping group.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MapGroup {
    pub output: MapTarget,
    pub input: u16,
}

impl fmt::Display for MapGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.output {
            MapTarget::All => write!(f, "{ALL_OUTPUTS}:{}", self.input),
            MapTarget::Output(out) => write!(f, "{}:{}", output_label(out), self.input),
        }
    }
}

/// Parse `O:I`: `O` is one letter, one or two digits, or `*`; `I` is one or
/// two digits.
pub fn parse_map_group(value: &str) -> Result<MapGroup, String> {
    let invalid = || format!("invalid mapping format: {value} (expected O:I, e.g. B:2)");

    let (out, input) = value.split_once(':').ok_or_else(invalid)?;
    let input = parse_number(input).ok_or_else(invalid)?;

    let output = match out.as_bytes() {
        [b'*'] => MapTarget::All,
        [letter] if letter.is_ascii_alphabetic() => {
            MapTarget::Output(u16::from(letter.to_ascii_uppercase() - b'A') + 1)
        }
        _ => MapTarget::Output(parse_number(out).ok_or_else(invalid)?),
    };

    Ok(MapGroup { output, input })
}

fn parse_number(text: &str) -> Option<u16> {
    if text.is_empty() || text.len() > 2 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Validated mapping request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MapPlan {
    /// Route one input to every output.
    All(u16),
    /// `(output, input)` pairs in command-line order.
    Pairs(Vec<(u16, u16)>),
}

pub fn plan(groups: &[MapGroup]) -> CliResult<MapPlan> {
    if let Some(all) = groups.iter().find(|g| g.output == MapTarget::All) {
        if groups.len() > 1 {
            return Err(CliError::usage(format!(
                "only one mapping group may be given when using {ALL_OUTPUTS} as output"
            )));
        }
        return Ok(MapPlan::All(all.input));
    }

    let mut pairs: Vec<(u16, u16)> = Vec::with_capacity(groups.len());
    for group in groups {
        let MapTarget::Output(out) = group.output else {
            continue;
        };
        if pairs.iter().any(|(seen, _)| *seen == out) {
            return Err(CliError::usage(format!(
                "duplicated mapping for output {} ({out})",
                output_label(out)
            )));
        }
        pairs.push((out, group.input));
    }
    Ok(MapPlan::Pairs(pairs))
}

pub fn run(args: ControlArgs, format: OutputFormat) -> CliResult<i32> {
    let plan = plan(&args.map)?;
    let mut matrix = args.device.open()?;

    let applied = apply(&mut matrix, &plan)?;
    let endpoint = matrix.endpoint();
    matrix
        .disconnect()
        .map_err(|err| driver_error("disconnect failed", err))?;

    print_routes(&endpoint.to_string(), &applied, false, format);
    Ok(SUCCESS)
}

fn apply(matrix: &mut HdmiMatrix, plan: &MapPlan) -> CliResult<Vec<Route>> {
    match plan {
        MapPlan::All(input) => {
            matrix
                .map_all(*input)
                .map_err(|err| driver_error(&format!("map input {input} to all outputs"), err))?;
            Ok((1..=matrix.num_outputs())
                .map(|out| Route::new(out, *input))
                .collect())
        }
        MapPlan::Pairs(pairs) => {
            let mut applied = Vec::with_capacity(pairs.len());
            for &(out, input) in pairs {
                matrix.map_port(input, out).map_err(|err| {
                    driver_error(
                        &format!("map output {} to input {input}", output_label(out)),
                        err,
                    )
                })?;
                applied.push(Route::new(out, input));
            }
            Ok(applied)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit::USAGE;

    fn group(value: &str) -> MapGroup {
        parse_map_group(value).unwrap()
    }

    #[test]
    fn parses_letters_numbers_and_all() {
        assert_eq!(
            group("B:2"),
            MapGroup {
                output: MapTarget::Output(2),
                input: 2
            }
        );
        assert_eq!(group("d:1").output, MapTarget::Output(4));
        assert_eq!(group("12:3").output, MapTarget::Output(12));
        assert_eq!(
            group("*:4"),
            MapGroup {
                output: MapTarget::All,
                input: 4
            }
        );
    }

    #[test]
    fn rejects_malformed_groups() {
        for bad in ["", "A", "A:", ":1", "AB:1", "123:1", "A:123", "A:x", "A-1", "*:*"] {
            assert!(parse_map_group(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn plan_keeps_command_line_order() {
        let plan = plan(&[group("C:1"), group("1:2")]).unwrap();
        assert_eq!(plan, MapPlan::Pairs(vec![(3, 1), (1, 2)]));
    }

    #[test]
    fn plan_rejects_duplicate_outputs() {
        let err = plan(&[group("B:1"), group("2:3")]).unwrap_err();
        assert_eq!(err.code, USAGE);
        assert!(err.message.contains("output B (2)"), "{}", err.message);
    }

    #[test]
    fn all_outputs_must_stand_alone() {
        assert_eq!(plan(&[group("*:3")]).unwrap(), MapPlan::All(3));

        let err = plan(&[group("*:3"), group("A:1")]).unwrap_err();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn display_round_trips_through_parser() {
        for text in ["A:1", "*:2", "D:4"] {
            assert_eq!(group(text).to_string(), text);
        }
    }
}
