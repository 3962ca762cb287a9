//! Line-oriented script parser
//!
//! One command per line. `//` starts a comment; blank lines are skipped.
//!
//! ```text
//! begin(T1)
//! R(T1, x2)
//! W(T1, x4, 91)   // buffered at every up site
//! end(T1)
//! fail(3)
//! recover(3)
//! dump()
//! ```

use std::fmt;

use super::errors::{ScriptError, ScriptResult};
use crate::model::{SiteId, TransactionId, Value, VariableId};

/// A single parsed script command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Begin(TransactionId),
    Read(TransactionId, VariableId),
    Write(TransactionId, VariableId, Value),
    End(TransactionId),
    Fail(SiteId),
    Recover(SiteId),
    Dump,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Begin(t) => write!(f, "begin({})", t),
            Command::Read(t, x) => write!(f, "R({}, {})", t, x),
            Command::Write(t, x, v) => write!(f, "W({}, {}, {})", t, x, v),
            Command::End(t) => write!(f, "end({})", t),
            Command::Fail(s) => write!(f, "fail({})", s),
            Command::Recover(s) => write!(f, "recover({})", s),
            Command::Dump => write!(f, "dump()"),
        }
    }
}

/// Parses one line. Returns `Ok(None)` for blank and comment-only lines.
///
/// Errors are reported against line 1; `parse_script` re-labels them.
pub fn parse_line(line: &str) -> ScriptResult<Option<Command>> {
    let text = match line.find("//") {
        Some(pos) => &line[..pos],
        None => line,
    }
    .trim();
    if text.is_empty() {
        return Ok(None);
    }

    let (name, args) = split_call(text).ok_or_else(|| {
        ScriptError::parse(1, format!("expected name(args), got '{}'", text))
    })?;

    let command = match name {
        "begin" => Command::Begin(transaction(exactly::<1>(name, &args)?[0])?),
        "end" => Command::End(transaction(exactly::<1>(name, &args)?[0])?),
        "R" => {
            let [t, x] = exactly::<2>(name, &args)?;
            Command::Read(transaction(t)?, variable(x)?)
        }
        "W" => {
            let [t, x, v] = exactly::<3>(name, &args)?;
            Command::Write(transaction(t)?, variable(x)?, value(v)?)
        }
        "fail" => Command::Fail(site(exactly::<1>(name, &args)?[0])?),
        "recover" => Command::Recover(site(exactly::<1>(name, &args)?[0])?),
        "dump" => {
            exactly::<0>(name, &args)?;
            Command::Dump
        }
        other => return Err(ScriptError::parse(1, format!("unknown command '{}'", other))),
    };
    Ok(Some(command))
}

/// Parses a whole script into `(line number, command)` pairs.
///
/// Stops at the first malformed line.
pub fn parse_script(text: &str) -> ScriptResult<Vec<(usize, Command)>> {
    let mut commands = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line_no = i + 1;
        if let Some(command) = parse_line(line).map_err(|e| e.at_line(line_no))? {
            commands.push((line_no, command));
        }
    }
    Ok(commands)
}

/// `name(a, b, c)` -> ("name", ["a", "b", "c"])
fn split_call(text: &str) -> Option<(&str, Vec<&str>)> {
    let open = text.find('(')?;
    let inner = text[open + 1..].strip_suffix(')')?;
    let name = text[..open].trim();
    if name.is_empty() {
        return None;
    }
    let args = if inner.trim().is_empty() {
        Vec::new()
    } else {
        inner.split(',').map(str::trim).collect()
    };
    Some((name, args))
}

fn exactly<'a, const N: usize>(name: &str, args: &[&'a str]) -> ScriptResult<[&'a str; N]> {
    <[&'a str; N]>::try_from(args).map_err(|_| {
        ScriptError::parse(
            1,
            format!("{} takes {} argument(s), got {}", name, N, args.len()),
        )
    })
}

fn numbered<T: std::str::FromStr>(token: &str, prefix: &str, what: &str) -> ScriptResult<T> {
    token
        .strip_prefix(prefix)
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(|| ScriptError::parse(1, format!("invalid {} '{}'", what, token)))
}

fn transaction(token: &str) -> ScriptResult<TransactionId> {
    numbered(token, "T", "transaction").map(TransactionId::new)
}

fn variable(token: &str) -> ScriptResult<VariableId> {
    numbered(token, "x", "variable").map(VariableId::new)
}

fn site(token: &str) -> ScriptResult<SiteId> {
    numbered(token, "", "site").map(SiteId::new)
}

fn value(token: &str) -> ScriptResult<Value> {
    token
        .parse()
        .map_err(|_| ScriptError::parse(1, format!("invalid value '{}'", token)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(n: u64) -> TransactionId {
        TransactionId::new(n)
    }

    fn x(n: u32) -> VariableId {
        VariableId::new(n)
    }

    fn parse(line: &str) -> Command {
        parse_line(line).unwrap().unwrap()
    }

    fn parse_err(line: &str) -> String {
        match parse_line(line) {
            Err(ScriptError::Parse { message, .. }) => message,
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    // === Commands ===

    #[test]
    fn test_parse_each_command() {
        assert_eq!(parse("begin(T1)"), Command::Begin(t(1)));
        assert_eq!(parse("R(T2, x4)"), Command::Read(t(2), x(4)));
        assert_eq!(parse("W(T3, x5, -7)"), Command::Write(t(3), x(5), -7));
        assert_eq!(parse("end(T12)"), Command::End(t(12)));
        assert_eq!(parse("fail(3)"), Command::Fail(SiteId::new(3)));
        assert_eq!(parse("recover(10)"), Command::Recover(SiteId::new(10)));
        assert_eq!(parse("dump()"), Command::Dump);
    }

    #[test]
    fn test_whitespace_tolerated() {
        assert_eq!(parse("  W( T1 ,x2 , 30 )  "), Command::Write(t(1), x(2), 30));
        assert_eq!(parse("dump( )"), Command::Dump);
    }

    #[test]
    fn test_display_round_trips_syntax() {
        assert_eq!(parse("W(T1,x2,30)").to_string(), "W(T1, x2, 30)");
        assert_eq!(parse("fail(4)").to_string(), "fail(4)");
    }

    // === Comments and blanks ===

    #[test]
    fn test_comments_and_blank_lines_skipped() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("// Test 1").unwrap(), None);
        assert_eq!(parse("R(T1, x2) // reads 20"), Command::Read(t(1), x(2)));
    }

    // === Errors ===

    #[test]
    fn test_malformed_lines_rejected() {
        assert!(parse_err("begin T1").contains("expected name(args)"));
        assert!(parse_err("begin(1)").contains("invalid transaction"));
        assert!(parse_err("R(T1, y2)").contains("invalid variable"));
        assert!(parse_err("W(T1, x2)").contains("takes 3 argument(s)"));
        assert!(parse_err("W(T1, x2, ten)").contains("invalid value"));
        assert!(parse_err("fail(s3)").contains("invalid site"));
        assert!(parse_err("beginRO(T1)").contains("unknown command"));
        assert!(parse_err("dump(1)").contains("takes 0 argument(s)"));
    }

    #[test]
    fn test_parse_script_reports_line_numbers() {
        let script = "// header\nbegin(T1)\n\nR(T1, x2)\n";
        let commands = parse_script(script).unwrap();
        assert_eq!(
            commands,
            vec![(2, Command::Begin(t(1))), (4, Command::Read(t(1), x(2)))]
        );

        let err = parse_script("begin(T1)\nbogus(T1)\n").unwrap_err();
        assert!(matches!(err, ScriptError::Parse { line: 2, .. }));
    }
}
