//! Query-level optimizer hints, extracted from a leading `/*+ ... */`
//! comment block ahead of the statement proper and parsed into a small
//! dedicated hint grammar rather than discarded with the rest of the
//! comment.

use std::collections::HashMap;

/// Per-query planner hints. All fields default to "no hint given", in
/// which case the planner falls back to its own cost-based choice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptimizerHints {
    /// `HASH_JOIN(a b)` — prefer a hash join whenever these tables meet.
    pub hash_join_tables: Vec<String>,
    /// `MERGE_JOIN(a b)` — prefer a sort-merge join whenever these tables meet.
    pub merge_join_tables: Vec<String>,
    /// `LEADING(a b c)` — fix the left-to-right join order exactly.
    pub leading: Vec<String>,
    /// `STRAIGHT_JOIN` — join in FROM-clause order, skipping DP/bushy search.
    pub straight_join: bool,
    /// `USE_INDEX(t idx)` — prefer this index for table `t` if applicable.
    pub use_index: HashMap<String, String>,
    /// `FORCE_INDEX(t idx)` — use this index for table `t` unconditionally.
    pub force_index: HashMap<String, String>,
    /// `IGNORE_INDEX(t idx)` — never consider this index for table `t`.
    pub ignore_index: HashMap<String, String>,
    /// `HASH_AGG` — prefer hash-based aggregation.
    pub hash_agg: bool,
    /// `STREAM_AGG` — prefer stream (sort-based) aggregation.
    pub stream_agg: bool,
    /// `SEMI_JOIN_REWRITE` — rewrite `IN`/`EXISTS` subqueries into semi-joins.
    pub semi_join_rewrite: bool,
    /// `NO_DECORRELATE` — leave correlated subqueries as-is.
    pub no_decorrelate: bool,
    /// `QB_NAME(name)` — label this query block for diagnostics.
    pub qb_name: Option<String>,
    pub max_execution_time: Option<u64>,
    pub memory_quota: Option<u64>,
}

impl OptimizerHints {
    /// Parse the hint directives out of a `/*+ ... */` block, if the SQL
    /// text opens with one. Unrecognized directive names are ignored
    /// rather than rejected, since hints are advisory.
    pub fn parse(sql: &str) -> Self {
        Self::extract(sql).0
    }

    /// Parse the hint block and return it alongside the SQL with that
    /// block stripped out, ready to hand to the SQL parser. Returns the
    /// input unchanged (as `Cow::Borrowed`-equivalent owned text) when no
    /// hint block is present.
    pub fn extract(sql: &str) -> (Self, String) {
        let leading_ws_len = sql.len() - sql.trim_start().len();
        let trimmed = &sql[leading_ws_len..];
        let Some((body, block_len)) = extract_hint_block(trimmed) else {
            return (Self::default(), sql.to_string());
        };
        let mut hints = Self::default();
        for directive in split_directives(&body) {
            apply_directive(&mut hints, &directive);
        }
        let cleaned = format!("{}{}", &sql[..leading_ws_len], &trimmed[block_len..]);
        (hints, cleaned)
    }
}

/// Returns the hint block's directive body and the byte length of the
/// whole `/*+ ... */` comment (so the caller can slice it out of the
/// original text).
fn extract_hint_block(sql: &str) -> Option<(String, usize)> {
    let rest = sql.strip_prefix("/*+")?;
    let end = rest.find("*/")?;
    Some((rest[..end].trim().to_string(), 3 + end + 2))
}

/// Split `NAME(arg1 arg2), OTHER_NAME` into individual directive strings,
/// respecting parens so arguments aren't split on internal commas.
fn split_directives(body: &str) -> Vec<String> {
    let mut directives = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for ch in body.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => {
                if !current.trim().is_empty() {
                    directives.push(current.trim().to_string());
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        directives.push(current.trim().to_string());
    }
    directives
}

fn directive_args(directive: &str) -> (&str, Vec<&str>) {
    match directive.find('(') {
        Some(open) if directive.ends_with(')') => {
            let name = directive[..open].trim();
            let args = directive[open + 1..directive.len() - 1].split_whitespace().collect();
            (name, args)
        }
        _ => (directive.trim(), Vec::new()),
    }
}

fn apply_directive(hints: &mut OptimizerHints, directive: &str) {
    let (name, args) = directive_args(directive);
    match name.to_ascii_uppercase().as_str() {
        "HASH_JOIN" => hints.hash_join_tables.extend(args.iter().map(|s| s.to_string())),
        "MERGE_JOIN" => hints.merge_join_tables.extend(args.iter().map(|s| s.to_string())),
        "LEADING" => hints.leading = args.iter().map(|s| s.to_string()).collect(),
        "STRAIGHT_JOIN" => hints.straight_join = true,
        "USE_INDEX" => insert_index_hint(&mut hints.use_index, &args),
        "FORCE_INDEX" => insert_index_hint(&mut hints.force_index, &args),
        "IGNORE_INDEX" => insert_index_hint(&mut hints.ignore_index, &args),
        "HASH_AGG" => hints.hash_agg = true,
        "STREAM_AGG" => hints.stream_agg = true,
        "SEMI_JOIN_REWRITE" => hints.semi_join_rewrite = true,
        "NO_DECORRELATE" => hints.no_decorrelate = true,
        "QB_NAME" => hints.qb_name = args.first().map(|s| s.to_string()),
        "MAX_EXECUTION_TIME" => hints.max_execution_time = args.first().and_then(|s| s.parse().ok()),
        "MEMORY_QUOTA" => hints.memory_quota = args.first().and_then(|s| s.parse().ok()),
        _ => {}
    }
}

fn insert_index_hint(map: &mut HashMap<String, String>, args: &[&str]) {
    if let [table, index] = args {
        map.insert(table.to_string(), index.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_hint_block_yields_defaults() {
        let hints = OptimizerHints::parse("SELECT * FROM t");
        assert_eq!(hints, OptimizerHints::default());
    }

    #[test]
    fn parses_leading_and_straight_join() {
        let hints = OptimizerHints::parse("/*+ LEADING(a b c), STRAIGHT_JOIN */ SELECT * FROM a, b, c");
        assert_eq!(hints.leading, vec!["a", "b", "c"]);
        assert!(hints.straight_join);
    }

    #[test]
    fn parses_index_hints_with_table_and_name() {
        let hints = OptimizerHints::parse("/*+ USE_INDEX(orders idx_customer) */ SELECT * FROM orders");
        assert_eq!(hints.use_index.get("orders"), Some(&"idx_customer".to_string()));
    }

    #[test]
    fn parses_multiple_comma_separated_directives() {
        let hints = OptimizerHints::parse("/*+ HASH_AGG, MAX_EXECUTION_TIME(500) */ SELECT 1");
        assert!(hints.hash_agg);
        assert_eq!(hints.max_execution_time, Some(500));
    }

    #[test]
    fn unrecognized_directive_is_ignored_not_rejected() {
        let hints = OptimizerHints::parse("/*+ NOT_A_REAL_HINT(x) */ SELECT 1");
        assert_eq!(hints, OptimizerHints::default());
    }

    #[test]
    fn extract_strips_the_hint_block_from_the_sql_text() {
        let (hints, cleaned) = OptimizerHints::extract("/*+ STRAIGHT_JOIN */ SELECT * FROM a, b");
        assert!(hints.straight_join);
        assert_eq!(cleaned, " SELECT * FROM a, b");
    }

    #[test]
    fn extract_leaves_sql_without_a_hint_block_unchanged() {
        let (hints, cleaned) = OptimizerHints::extract("SELECT * FROM t");
        assert_eq!(hints, OptimizerHints::default());
        assert_eq!(cleaned, "SELECT * FROM t");
    }
}
