//! Macro preprocessor.
//!
//! Rewrites the parsed line stream so that no `MACRO`/`MEND` statement
//! survives and every invocation of a defined macro is replaced by its
//! parameter-substituted body. Definition lines stay in the stream demoted
//! to comments, so the listing can show them without addresses. Expanded
//! body lines carry the invocation's line number.
//!
//! A macro may invoke a macro defined earlier; definitions may not nest
//! and no macro may appear in its own expansion.

use std::collections::HashMap;

use crate::error::{AsmError, ErrorKind};
use crate::operand::split_commas;
use crate::parser::{LineBody, SourceLine};

const MACRO: &str = "MACRO";
const MEND: &str = "MEND";

struct Macro {
    params: Vec<String>,
    body: Vec<SourceLine>,
}

type MacroTable = HashMap<String, Macro>;

fn macro_error<M: Into<String>>(line: u32, message: M) -> AsmError {
    AsmError::new(ErrorKind::Macro, line, message)
}

/// Demote a definition line to a comment, keeping its text for the listing.
fn demoted(line: &SourceLine) -> SourceLine {
    SourceLine {
        number: line.number,
        text: line.text.clone(),
        body: LineBody::Comment,
    }
}

pub fn expand(lines: Vec<SourceLine>) -> Result<Vec<SourceLine>, AsmError> {
    let mut table = MacroTable::new();
    let mut out = Vec::with_capacity(lines.len());
    // (name, collected definition) while between MACRO and MEND
    let mut defining: Option<(String, Macro)> = None;

    for line in lines {
        let mnemonic = line.mnemonic();

        if defining.is_some() {
            match mnemonic {
                Some(MACRO) => {
                    return Err(macro_error(
                        line.number,
                        "macro definitions cannot be nested",
                    ));
                }
                Some(MEND) => {
                    out.push(demoted(&line));
                    let (name, def) = defining.take().unwrap();
                    table.insert(name, def);
                }
                _ => {
                    defining.as_mut().unwrap().1.body.push(line.clone());
                    out.push(demoted(&line));
                }
            }
            continue;
        }

        match mnemonic {
            Some(MACRO) => {
                let name = line
                    .label()
                    .ok_or_else(|| macro_error(line.number, "MACRO requires a name label"))?
                    .to_owned();
                let params = match line.operand() {
                    Some(text) => split_commas(text),
                    None => Vec::new(),
                };
                for param in &params {
                    if !param.starts_with('&') {
                        return Err(macro_error(
                            line.number,
                            format!("macro parameter \"{}\" must begin with &", param),
                        ));
                    }
                }
                out.push(demoted(&line));
                defining = Some((
                    name,
                    Macro {
                        params,
                        body: Vec::new(),
                    },
                ));
            }
            Some(MEND) => {
                return Err(macro_error(line.number, "MEND outside a macro definition"));
            }
            Some(name) if table.contains_key(name) => {
                let name = name.to_owned();
                let mut active = Vec::new();
                invoke(
                    &table,
                    &name,
                    line.operand(),
                    line.number,
                    &mut active,
                    &mut out,
                )?;
            }
            _ => out.push(line),
        }
    }

    if defining.is_some() {
        return Err(macro_error(
            lines_end(&out),
            "macro definition is missing MEND",
        ));
    }

    Ok(out)
}

fn lines_end(out: &[SourceLine]) -> u32 {
    out.last().map(|l| l.number).unwrap_or(0)
}

fn invoke(
    table: &MacroTable,
    name: &str,
    arguments: Option<&str>,
    number: u32,
    active: &mut Vec<String>,
    out: &mut Vec<SourceLine>,
) -> Result<(), AsmError> {
    if active.iter().any(|n| n == name) {
        return Err(macro_error(
            number,
            format!("macro \"{}\" invokes itself", name),
        ));
    }

    let def = &table[name];
    let args = match arguments {
        Some(text) => split_commas(text),
        None => Vec::new(),
    };
    if args.len() != def.params.len() {
        return Err(macro_error(
            number,
            format!(
                "macro \"{}\" takes {} argument(s), got {}",
                name,
                def.params.len(),
                args.len()
            ),
        ));
    }

    // longest first, so &BUF does not shadow &BUFEND
    let mut order: Vec<usize> = (0..def.params.len()).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(def.params[i].len()));

    active.push(name.to_owned());
    for body_line in &def.body {
        let expanded = substitute(body_line, &def.params, &args, &order, number);
        if let Some(m) = expanded.mnemonic() {
            if table.contains_key(m) {
                let m = m.to_owned();
                invoke(table, &m, expanded.operand(), number, active, out)?;
                continue;
            }
        }
        out.push(expanded);
    }
    active.pop();

    Ok(())
}

fn substitute(
    line: &SourceLine,
    params: &[String],
    args: &[String],
    order: &[usize],
    number: u32,
) -> SourceLine {
    let subst = |text: &str| subst_text(text, params, args, order);

    match &line.body {
        LineBody::Comment => SourceLine {
            number,
            text: line.text.clone(),
            body: LineBody::Comment,
        },
        LineBody::Statement {
            label,
            mnemonic,
            extended,
            operand,
        } => {
            let label = label.as_deref().map(subst);
            let mut extended = *extended;
            let mnemonic = mnemonic.as_deref().map(subst).map(|m| {
                // an argument may carry the + prefix into the mnemonic
                match m.strip_prefix('+') {
                    Some(stripped) => {
                        extended = true;
                        stripped.to_owned()
                    }
                    None => m,
                }
            });
            let operand = operand.as_deref().map(subst);
            SourceLine::statement(number, label, mnemonic, extended, operand)
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Replace each `&NAME` occurrence by its argument. The token must end at
/// a non-identifier character, so `&B` does not fire inside `&B2` and a
/// parameter never substitutes into the middle of another identifier.
fn subst_text(text: &str, params: &[String], args: &[String], order: &[usize]) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    'outer: while let Some(at) = rest.find('&') {
        result.push_str(&rest[..at]);
        let candidate = &rest[at..];
        for &index in order {
            let param = &params[index];
            if candidate.starts_with(param.as_str()) {
                let after = candidate[param.len()..].chars().next();
                if after.map_or(true, |c| !is_ident_char(c)) {
                    result.push_str(&args[index]);
                    rest = &candidate[param.len()..];
                    continue 'outer;
                }
            }
        }
        result.push('&');
        rest = &candidate[1..];
    }
    result.push_str(rest);
    result
}
