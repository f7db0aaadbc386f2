use std::ops::Range;

use georange_core::region::{lat_lon, validate_coordinate, Coord};
use thiserror::Error;
use yansi::{Condition, Paint};

/// An error that happened while parsing coordinates given on the command
/// line
#[derive(Error, Debug)]
pub enum CoordinateError {
    #[error("{0}")]
    Parse(String),
}

/// Parse a coordinate written as `lat,lon`
pub fn parse_coordinate(input: &str) -> Result<Coord, CoordinateError> {
    let trimmed_start = input.len() - input.trim_start().len();
    let token = input.trim();
    if token.is_empty() {
        return Err(CoordinateError::Parse(
            "Coordinate must not be empty".to_string(),
        ));
    }
    parse_token(input, token, trimmed_start)
}

/// Parse a whitespace-separated list of coordinates
pub fn parse_ring(input: &str) -> Result<Vec<Coord>, CoordinateError> {
    let mut result = Vec::new();
    let mut offset = 0;
    for token in input.split_whitespace() {
        // split_whitespace doesn't report positions
        let start = offset + input[offset..].find(token).unwrap_or(0);
        result.push(parse_token(input, token, start)?);
        offset = start + token.len();
    }
    if result.is_empty() {
        return Err(CoordinateError::Parse("Ring must not be empty".to_string()));
    }
    Ok(result)
}

fn parse_token(input: &str, token: &str, start: usize) -> Result<Coord, CoordinateError> {
    let span = start..start + token.len();
    let Some(comma) = token.find(',') else {
        return Err(highlight(
            input,
            span,
            "Expected a coordinate in the form `lat,lon'.",
        ));
    };

    let lat_str = &token[..comma];
    let lon_str = &token[comma + 1..];
    let lat_span = start..start + comma;
    let lon_span = start + comma + 1..span.end;

    let lat = lat_str
        .parse::<f64>()
        .map_err(|_| highlight(input, lat_span.clone(), "Invalid latitude."))?;
    let lon = lon_str
        .parse::<f64>()
        .map_err(|_| highlight(input, lon_span.clone(), "Invalid longitude."))?;

    if validate_coordinate(lat, 0.0).is_err() {
        return Err(highlight(
            input,
            lat_span,
            "Latitude must be between -90 and 90.",
        ));
    }
    if validate_coordinate(0.0, lon).is_err() {
        return Err(highlight(
            input,
            lon_span,
            "Longitude must be between -180 and 180.",
        ));
    }

    Ok(lat_lon(lat, lon))
}

fn highlight(input: &str, span: Range<usize>, msg: &str) -> CoordinateError {
    // extract snippet
    let bytes = input.as_bytes();
    let mut snippet_start = span.start;
    while snippet_start > 0 && bytes[snippet_start - 1] != b'\n' {
        snippet_start -= 1;
    }
    let mut snippet_end = span.end;
    while snippet_end < bytes.len() && bytes[snippet_end] != b'\n' {
        snippet_end += 1;
    }
    let snippet = &input[snippet_start..snippet_end];

    // format message
    let prefix = span.start - snippet_start;
    let span_len = span.end - span.start;
    let center_prefix = ((span_len + 1) / 2).saturating_sub(1);
    let center_suffix = span_len / 2;
    CoordinateError::Parse(
        format!(
            "Unable to parse coordinates\n\n{}{}{}\n{}{}{}{}\n{}{}{}",
            &snippet[0..prefix],
            &snippet[prefix..prefix + span_len].red(),
            &snippet[prefix + span_len..],
            " ".repeat(prefix),
            "─".repeat(center_prefix).red(),
            (if span_len > 0 { "┬" } else { "│" }).red(),
            "─".repeat(center_suffix).red(),
            " ".repeat(prefix + center_prefix),
            "╰── ".red(),
            msg.red().bold()
        )
        .whenever(Condition::from(|| {
            Condition::stderr_is_tty() && Condition::clicolor() && Condition::no_color()
        }))
        .to_string(),
    )
}

#[cfg(test)]
mod tests {
    use assertor::{assert_that, EqualityAssertion, StringAssertion};
    use georange_core::region::lat_lon;

    use super::{parse_coordinate, parse_ring};

    #[test]
    fn coordinates() {
        assert_that!(parse_coordinate("44.984924,-111.044691").unwrap())
            .is_equal_to(lat_lon(44.984924, -111.044691));
        assert_that!(parse_coordinate("  -41,104 ").unwrap()).is_equal_to(lat_lon(-41.0, 104.0));
    }

    #[test]
    fn ring() {
        let ring = parse_ring("0,0  0,1\t1,1").unwrap();
        assert_that!(ring).is_equal_to(vec![lat_lon(0.0, 0.0), lat_lon(0.0, 1.0), lat_lon(1.0, 1.0)]);
    }

    #[test]
    fn errors_point_at_offending_part() {
        yansi::disable();

        let err = parse_ring("0,0 0,x 1,1").unwrap_err().to_string();
        assert_that!(err).contains("Invalid longitude.");
        // the marker is placed below the `x'
        assert_that!(err).contains("\n      ┬\n");

        let err = parse_coordinate("95,10").unwrap_err().to_string();
        assert_that!(err).contains("Latitude must be between -90 and 90.");

        let err = parse_coordinate("4510").unwrap_err().to_string();
        assert_that!(err).contains("lat,lon");

        assert_that!(parse_ring("   ").unwrap_err().to_string())
            .contains("Ring must not be empty");
    }
}
