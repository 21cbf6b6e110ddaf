//! SDC/XDC timing constraint file parser.
//!
//! Parses Synopsys Design Constraints (SDC) and Xilinx Design Constraints
//! (XDC) files into a [`TimingConstraints`] database. Supports:
//!
//! - `create_clock` — define a netlist or virtual clock
//! - `set_input_delay`/`set_output_delay` — constrain port timing
//! - `set_false_path` — exclude paths from timing analysis
//! - `set_multicycle_path -setup` — allow multi-cycle paths (`-hold` is
//!   rejected; see module-level policy note below)
//! - `set_max_delay` — constrain maximum path delay
//! - `set_clock_groups -exclusive` — cut every path between two clock groups
//!
//! The parser is line-based (one command per line, backslash continuation
//! supported) and does not attempt full Tcl interpretation, matching the
//! original constraint reader's approach.
//!
//! Parsing runs in two passes: the first pass processes every
//! `create_clock` command so the clock table is complete before the second
//! pass resolves `-clock` references (including the bare `*` wildcard) and
//! classifies `-from`/`-to` exception lists against it. After both passes,
//! [`resolve_domain_constraints`] populates the `domain_constraint` matrix:
//! false paths win outright, then an exact `cc_constraints` match, then the
//! edge-counting default; `set_clock_groups -exclusive` cuts are applied
//! last so they are never overwritten by the default resolution.
//!
//! `cf_constraints`/`fc_constraints`/`ff_constraints` entries that carry a
//! `num_multicycles` are left with their literal `constraint_ns` unresolved
//! here (stored as `0.0`) when either endpoint is not a bare clock name —
//! the sink register's clock domain, and therefore its period, is only
//! known after clock propagation, so the STA engine finishes that
//! arithmetic per-path. Only `cc_constraints` (both endpoints literal clock
//! names) can be fully resolved at parse time, since both periods are
//! already on hand.

use crate::constraints::{
    ClockConstraint, FalsePath, IoDelay, OverrideConstraint, TimingConstraints,
};
use crate::edgecount;
use crate::errors::TimingError;
use crate::ids::ClockIndex;
use crate::pattern;
use aion_common::{Ident, Interner};
use aion_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use aion_source::Span;

/// Parses an SDC/XDC constraint file into a [`TimingConstraints`] database.
///
/// Lines starting with `#` are comments; backslash-newline continuation is
/// supported. Unrecognized commands are reported as warnings and skipped.
/// Malformed recognized commands (missing required flags, `-hold`
/// multicycle paths, an ambiguous `*` clock wildcard, undefined clock
/// references) fail the whole parse with a [`TimingError`].
pub fn parse_sdc(
    source: &str,
    interner: &Interner,
    sink: &DiagnosticSink,
) -> Result<TimingConstraints, TimingError> {
    let mut constraints = TimingConstraints::new();
    let joined = join_continuation_lines(source);

    let lines: Vec<Vec<&str>> = joined
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(tokenize_sdc_line)
        .filter(|tokens| !tokens.is_empty())
        .collect();

    for tokens in &lines {
        if tokens[0] == "create_clock" {
            parse_create_clock(&tokens[1..], interner, &mut constraints)?;
        }
    }

    if constraints.clock_count() == 0 {
        constraints.add_clock(ClockConstraint {
            name: interner.get_or_intern("default_clock"),
            period_ns: 0.0,
            port: None,
            waveform: None,
        });
    }

    let mut exclusive_groups: Vec<(Vec<ClockIndex>, Vec<ClockIndex>)> = Vec::new();

    for tokens in &lines {
        match tokens[0] {
            "create_clock" => {} // handled in the first pass
            "set_input_delay" => {
                parse_set_io_delay(&tokens[1..], interner, &mut constraints, true)?;
            }
            "set_output_delay" => {
                parse_set_io_delay(&tokens[1..], interner, &mut constraints, false)?;
            }
            "set_false_path" => {
                parse_set_false_path(&tokens[1..], interner, &mut constraints);
            }
            "set_multicycle_path" => {
                parse_set_multicycle_path(&tokens[1..], interner, &mut constraints)?;
            }
            "set_max_delay" => {
                parse_set_max_delay(&tokens[1..], interner, &mut constraints);
            }
            "set_clock_groups" => {
                let pairs = parse_set_clock_groups(&tokens[1..], interner, &constraints)?;
                exclusive_groups.extend(pairs);
            }
            cmd => {
                sink.emit(Diagnostic::warning(
                    DiagnosticCode::new(Category::Timing, 1),
                    format!("unrecognized SDC command: `{cmd}`"),
                    Span::DUMMY,
                ));
            }
        }
    }

    resolve_domain_constraints(&mut constraints, interner);

    for (group_a, group_b) in &exclusive_groups {
        constraints.mark_exclusive_groups(group_a, group_b);
    }

    Ok(constraints)
}

/// Joins backslash-continuation lines into single logical lines.
fn join_continuation_lines(source: &str) -> String {
    let mut result = String::with_capacity(source.len());
    let mut continuation = false;

    for line in source.lines() {
        if continuation {
            result.push(' ');
        }
        let trimmed = line.trim_end();
        if let Some(stripped) = trimmed.strip_suffix('\\') {
            result.push_str(stripped);
            continuation = true;
        } else {
            result.push_str(trimmed);
            result.push('\n');
            continuation = false;
        }
    }

    result
}

/// Tokenizes an SDC line, handling basic quoting with braces and double quotes.
fn tokenize_sdc_line(line: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut chars = line.char_indices().peekable();

    while let Some(&(start, ch)) = chars.peek() {
        match ch {
            ' ' | '\t' => {
                chars.next();
            }
            '{' => {
                chars.next(); // skip '{'
                let inner_start = chars.peek().map_or(line.len(), |&(i, _)| i);
                let mut end = inner_start;
                for (i, c) in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    end = i + c.len_utf8();
                }
                tokens.push(&line[inner_start..end]);
            }
            '"' => {
                chars.next(); // skip '"'
                let inner_start = chars.peek().map_or(line.len(), |&(i, _)| i);
                let mut end = inner_start;
                for (i, c) in chars.by_ref() {
                    if c == '"' {
                        break;
                    }
                    end = i + c.len_utf8();
                }
                tokens.push(&line[inner_start..end]);
            }
            '[' => {
                // Skip Tcl command substitution [get_ports ...] — capture whole bracket expr
                let bracket_start = start;
                chars.next(); // skip '['
                let mut depth = 1;
                let mut end = start + 1;
                for (i, c) in chars.by_ref() {
                    end = i + c.len_utf8();
                    if c == '[' {
                        depth += 1;
                    } else if c == ']' {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                }
                // Extract inner content, skipping [get_ports ...]/[get_clocks ...]
                let inner = &line[bracket_start + 1..end - 1];
                let rest = inner
                    .strip_prefix("get_ports")
                    .or_else(|| inner.strip_prefix("get_clocks"));
                if let Some(rest) = rest {
                    let name = rest.trim().trim_matches(|c| c == '{' || c == '}');
                    if !name.is_empty() {
                        tokens.push(name);
                    }
                } else {
                    tokens.push(inner.trim());
                }
            }
            _ => {
                let mut end = start;
                for (i, c) in chars.by_ref() {
                    if c == ' ' || c == '\t' {
                        break;
                    }
                    end = i + c.len_utf8();
                }
                if end == start {
                    // Single char token
                    end = start + ch.len_utf8();
                    chars.next();
                }
                tokens.push(&line[start..end]);
            }
        }
    }

    tokens
}

/// Resolves a `-clock` argument, including the bare `*` wildcard, to a
/// clock name [`Ident`]. `*` is legal only when exactly one clock in the
/// constraint store targets a real netlist port.
fn resolve_clock_arg(
    raw: &str,
    constraints: &TimingConstraints,
    interner: &Interner,
) -> Result<Ident, TimingError> {
    if !pattern::is_bare_wildcard(raw) {
        return Ok(interner.get_or_intern(raw));
    }

    let netlist_clocks: Vec<ClockIndex> = (0..constraints.clock_count())
        .map(|i| ClockIndex::from_raw(i as u32))
        .filter(|&idx| constraints.clock(idx).port.is_some())
        .collect();

    match netlist_clocks.as_slice() {
        [only] => Ok(constraints.clock(*only).name),
        other => Err(TimingError::SdcSyntaxError(format!(
            "`-clock *` is only legal with exactly one netlist clock, found {}",
            other.len()
        ))),
    }
}

/// Parses `create_clock -period <val> [-name <name>] [-waveform {rise fall}] [targets]`.
///
/// With no trailing target token, registers a virtual clock (`port: None`)
/// per the bare `-name VIRT` form.
fn parse_create_clock(
    args: &[&str],
    interner: &Interner,
    constraints: &mut TimingConstraints,
) -> Result<(), TimingError> {
    let mut period: Option<f64> = None;
    let mut name: Option<&str> = None;
    let mut waveform: Option<(f64, f64)> = None;
    let mut port: Option<&str> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i] {
            "-period" => {
                i += 1;
                if i < args.len() {
                    period = args[i].parse().ok();
                }
            }
            "-name" => {
                i += 1;
                if i < args.len() {
                    name = Some(args[i]);
                }
            }
            "-waveform" => {
                i += 1;
                if i < args.len() {
                    let parts: Vec<&str> = args[i].split_whitespace().collect();
                    if parts.len() >= 2 {
                        if let (Ok(r), Ok(f)) = (parts[0].parse::<f64>(), parts[1].parse::<f64>()) {
                            waveform = Some((r, f));
                        }
                    }
                }
            }
            s if !s.starts_with('-') => {
                port = Some(s);
            }
            _ => {}
        }
        i += 1;
    }

    let Some(period_val) = period else {
        return Err(TimingError::SdcSyntaxError(
            "create_clock: missing -period".to_string(),
        ));
    };

    let clock_name = name.or(port).unwrap_or("default_clock");

    constraints.add_clock(ClockConstraint {
        name: interner.get_or_intern(clock_name),
        period_ns: period_val,
        port: port.map(|p| interner.get_or_intern(p)),
        waveform,
    });
    Ok(())
}

/// Parses `set_input_delay`/`set_output_delay -clock <clk> <delay> [port]`.
fn parse_set_io_delay(
    args: &[&str],
    interner: &Interner,
    constraints: &mut TimingConstraints,
    is_input: bool,
) -> Result<(), TimingError> {
    let cmd = if is_input {
        "set_input_delay"
    } else {
        "set_output_delay"
    };

    let mut clock: Option<&str> = None;
    let mut delay: Option<f64> = None;
    let mut port: Option<&str> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i] {
            "-clock" => {
                i += 1;
                if i < args.len() {
                    clock = Some(args[i]);
                }
            }
            "-max" => {
                i += 1;
                if i < args.len() {
                    delay = args[i].parse().ok();
                }
            }
            s if !s.starts_with('-') => {
                if delay.is_none() {
                    if let Ok(v) = s.parse::<f64>() {
                        delay = Some(v);
                    } else {
                        port = Some(s);
                    }
                } else {
                    port = Some(s);
                }
            }
            _ => {}
        }
        i += 1;
    }

    let clock_raw = clock
        .ok_or_else(|| TimingError::SdcSyntaxError(format!("{cmd}: missing -clock")))?;
    let delay_val = delay
        .ok_or_else(|| TimingError::SdcSyntaxError(format!("{cmd}: missing delay value")))?;

    let clock_name = resolve_clock_arg(clock_raw, constraints, interner)?;
    let clock_idx = constraints
        .clock_index(clock_name)
        .ok_or_else(|| TimingError::undefined_clock(interner, clock_name))?;

    let port_name = port.unwrap_or("*");
    let io_delay = IoDelay {
        port: interner.get_or_intern(port_name),
        clock: clock_idx,
        delay_ns: delay_val,
    };

    if is_input {
        constraints.constrained_inputs.push(io_delay);
    } else {
        constraints.constrained_outputs.push(io_delay);
    }
    Ok(())
}

/// Parses `set_false_path -from <from> -to <to>`.
fn parse_set_false_path(args: &[&str], interner: &Interner, constraints: &mut TimingConstraints) {
    let mut from = Vec::new();
    let mut to = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i] {
            "-from" => {
                i += 1;
                if i < args.len() {
                    from.extend(args[i].split_whitespace().map(|n| interner.get_or_intern(n)));
                }
            }
            "-to" => {
                i += 1;
                if i < args.len() {
                    to.extend(args[i].split_whitespace().map(|n| interner.get_or_intern(n)));
                }
            }
            _ => {}
        }
        i += 1;
    }

    constraints.false_paths.push(FalsePath { from, to });
}

/// Parses `set_multicycle_path -setup <N> -from <from> -to <to>`. Rejects
/// `-hold`: only the setup form is implemented.
fn parse_set_multicycle_path(
    args: &[&str],
    interner: &Interner,
    constraints: &mut TimingConstraints,
) -> Result<(), TimingError> {
    let mut cycles: u32 = 2;
    let mut from = Vec::new();
    let mut to = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i] {
            "-setup" => {}
            "-hold" => {
                return Err(TimingError::SdcSyntaxError(
                    "set_multicycle_path -hold is not supported; only -setup is implemented"
                        .to_string(),
                ));
            }
            "-from" => {
                i += 1;
                if i < args.len() {
                    from.extend(args[i].split_whitespace().map(|n| interner.get_or_intern(n)));
                }
            }
            "-to" => {
                i += 1;
                if i < args.len() {
                    to.extend(args[i].split_whitespace().map(|n| interner.get_or_intern(n)));
                }
            }
            s if !s.starts_with('-') => {
                if let Ok(n) = s.parse() {
                    cycles = n;
                }
            }
            _ => {}
        }
        i += 1;
    }

    push_override(constraints, from, to, None, Some(cycles));
    Ok(())
}

/// Parses `set_max_delay <delay> -from <from> -to <to>`.
fn parse_set_max_delay(args: &[&str], interner: &Interner, constraints: &mut TimingConstraints) {
    let mut delay: Option<f64> = None;
    let mut from = Vec::new();
    let mut to = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i] {
            "-from" => {
                i += 1;
                if i < args.len() {
                    from.extend(args[i].split_whitespace().map(|n| interner.get_or_intern(n)));
                }
            }
            "-to" => {
                i += 1;
                if i < args.len() {
                    to.extend(args[i].split_whitespace().map(|n| interner.get_or_intern(n)));
                }
            }
            s if !s.starts_with('-') => {
                if delay.is_none() {
                    delay = s.parse().ok();
                }
            }
            _ => {}
        }
        i += 1;
    }

    let delay_ns = delay.unwrap_or(0.0);
    push_override(constraints, from, to, Some(delay_ns), None);
}

/// Parses `set_clock_groups -exclusive -group {...} -group {...} ...` and
/// returns every ordered `(group_i, group_j)`, `i != j` pair to cut.
fn parse_set_clock_groups(
    args: &[&str],
    interner: &Interner,
    constraints: &TimingConstraints,
) -> Result<Vec<(Vec<ClockIndex>, Vec<ClockIndex>)>, TimingError> {
    let mut exclusive = false;
    let mut groups: Vec<Vec<ClockIndex>> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i] {
            "-exclusive" => exclusive = true,
            "-group" => {
                i += 1;
                if i < args.len() {
                    let mut idxs = Vec::new();
                    for name in args[i].split_whitespace() {
                        let ident = interner.get_or_intern(name);
                        let idx = constraints
                            .clock_index(ident)
                            .ok_or_else(|| TimingError::undefined_clock(interner, ident))?;
                        idxs.push(idx);
                    }
                    groups.push(idxs);
                }
            }
            _ => {}
        }
        i += 1;
    }

    if !exclusive {
        return Err(TimingError::SdcSyntaxError(
            "set_clock_groups without -exclusive is not supported".to_string(),
        ));
    }

    let mut pairs = Vec::new();
    for (gi, group_i) in groups.iter().enumerate() {
        for (gj, group_j) in groups.iter().enumerate() {
            if gi != gj {
                pairs.push((group_i.clone(), group_j.clone()));
            }
        }
    }
    Ok(pairs)
}

/// Returns `true` if every pattern in `names` literally names an existing
/// clock — the heuristic used to bucket an override into `cc`/`cf`/`fc`/`ff`.
fn is_clock_list(names: &[Ident], constraints: &TimingConstraints) -> bool {
    !names.is_empty()
        && names
            .iter()
            .all(|&n| constraints.clock_index(n).is_some())
}

/// Classifies and inserts an override into the matching bucket
/// (`cc`/`cf`/`fc`/`ff`), resolving `constraint_ns` immediately when both
/// endpoints are a single literal clock name (see module docs).
fn push_override(
    constraints: &mut TimingConstraints,
    from: Vec<Ident>,
    to: Vec<Ident>,
    literal_ns: Option<f64>,
    num_multicycles: Option<u32>,
) {
    let from_is_clock = is_clock_list(&from, constraints);
    let to_is_clock = is_clock_list(&to, constraints);

    let constraint_ns = match (from_is_clock, to_is_clock, num_multicycles, from.len(), to.len())
    {
        (true, true, Some(n), 1, 1) => {
            let src = constraints.clock_index(from[0]).unwrap();
            let snk = constraints.clock_index(to[0]).unwrap();
            let src_period = constraints.clock(src).period_ns;
            let snk_period = constraints.clock(snk).period_ns;
            let base = edgecount::edge_count_budget_ns(src_period, snk_period).unwrap_or(0.0);
            base + (n.saturating_sub(1)) as f64 * snk_period
        }
        _ => literal_ns.unwrap_or(0.0),
    };

    let override_constraint = OverrideConstraint {
        from,
        to,
        constraint_ns,
        num_multicycles,
    };

    match (from_is_clock, to_is_clock) {
        (true, true) => constraints.cc_constraints.push(override_constraint),
        (true, false) => constraints.cf_constraints.push(override_constraint),
        (false, true) => constraints.fc_constraints.push(override_constraint),
        (false, false) => constraints.ff_constraints.push(override_constraint),
    }
}

/// Populates the `domain_constraint` matrix for every clock pair: a
/// matching false path forces `DO_NOT_ANALYSE`, otherwise a matching
/// `cc_constraints` override supplies the budget, otherwise the
/// edge-counting default applies.
fn resolve_domain_constraints(constraints: &mut TimingConstraints, interner: &Interner) {
    let n = constraints.clock_count();

    for src_raw in 0..n {
        for snk_raw in 0..n {
            let src = ClockIndex::from_raw(src_raw as u32);
            let snk = ClockIndex::from_raw(snk_raw as u32);
            let src_name = interner.resolve(constraints.clock(src).name).to_string();
            let snk_name = interner.resolve(constraints.clock(snk).name).to_string();

            let is_false_path = constraints
                .false_paths
                .iter()
                .any(|fp| applies_to_names(fp, interner, &src_name, &snk_name));
            if is_false_path {
                constraints.set_domain_budget(src, snk, None);
                continue;
            }

            if let Some(ov) = constraints
                .cc_constraints
                .iter()
                .find(|o| o.applies_to(interner, &src_name, &snk_name))
            {
                constraints.set_domain_budget(src, snk, Some(ov.constraint_ns));
                continue;
            }

            let src_period = constraints.clock(src).period_ns;
            let snk_period = constraints.clock(snk).period_ns;
            let budget = edgecount::edge_count_budget_ns(src_period, snk_period);
            constraints.set_domain_budget(src, snk, budget);
        }
    }
}

fn applies_to_names(fp: &FalsePath, interner: &Interner, from_name: &str, to_name: &str) -> bool {
    let from_match = fp
        .from
        .iter()
        .any(|p| pattern::matches(interner.resolve(*p), from_name));
    let to_match = fp
        .to
        .iter()
        .any(|p| pattern::matches(interner.resolve(*p), to_name));
    from_match && to_match
}
