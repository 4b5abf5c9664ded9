use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// A single named rewrite rule.
///
/// Rules are pure string-to-string transforms, applied in the fixed order of
/// [`PIPELINE`]. Later rules assume earlier ones already ran (implicit
/// exponent insertion expects lowercased, whitespace-free input, and the
/// consolidation rules expect `^` markers to exist).
pub struct Rule {
    pub name: &'static str,
    pub apply: fn(&str) -> String,
}

/// The full-normalization pipeline, in application order.
pub static PIPELINE: &[Rule] = &[
    Rule {
        name: "fold_case",
        apply: fold_case,
    },
    Rule {
        name: "strip_whitespace",
        apply: strip_whitespace,
    },
    Rule {
        name: "fold_superscript_digits",
        apply: fold_superscript_digits,
    },
    Rule {
        name: "insert_implicit_exponent",
        apply: insert_implicit_exponent,
    },
    Rule {
        name: "consolidate_function_power",
        apply: consolidate_function_power,
    },
    Rule {
        name: "collapse_self_division",
        apply: collapse_self_division,
    },
    Rule {
        name: "collapse_self_multiplication",
        apply: collapse_self_multiplication,
    },
    Rule {
        name: "drop_single_variable_parens",
        apply: drop_single_variable_parens,
    },
    Rule {
        name: "elide_power_of_one",
        apply: elide_power_of_one,
    },
];

/// Run the whole pipeline over one input.
pub fn apply_pipeline(raw: &str) -> String {
    PIPELINE
        .iter()
        .fold(raw.to_string(), |text, rule| (rule.apply)(&text))
}

/// Lowercase everything. Function names and variables are case-insensitive
/// in this domain (`SIN(x)` and `sin(x)` must share a cache entry).
fn fold_case(input: &str) -> String {
    input.to_lowercase()
}

/// Strip all whitespace. Visual spacing carries no semantic weight and would
/// otherwise fragment the cache by cosmetic variation.
fn strip_whitespace(input: &str) -> String {
    input.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Map Unicode superscript digits to ASCII digits in a single pass, so that
/// adjacent superscripts keep their order (`x²¹` -> `x21`).
fn fold_superscript_digits(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '⁰' => '0',
            '¹' => '1',
            '²' => '2',
            '³' => '3',
            '⁴' => '4',
            '⁵' => '5',
            '⁶' => '6',
            '⁷' => '7',
            '⁸' => '8',
            '⁹' => '9',
            other => other,
        })
        .collect()
}

static RE_IMPLICIT_POWER_PAREN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z]+)([0-9]+)\(").unwrap());
static RE_IMPLICIT_POWER_LETTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z]+)([0-9]+)([a-z])").unwrap());

/// Insert a `^` where a power was written as a bare digit suffix:
/// `sin12(x)` -> `sin^12(x)` and `sin12x` -> `sin^12x`.
///
/// Known heuristic limitation: a trailing digit that is really part of a
/// multi-character identifier (`var2x`) is indistinguishable from a genuine
/// exponent and gets rewritten the same way.
fn insert_implicit_exponent(input: &str) -> String {
    let step = RE_IMPLICIT_POWER_PAREN.replace_all(input, "${1}^${2}(");
    RE_IMPLICIT_POWER_LETTER
        .replace_all(&step, "${1}^${2}${3}")
        .into_owned()
}

static RE_PARENTHESIZED_POWER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([a-z]+)([^)]+)\)\^([0-9]+)").unwrap());
static RE_POWERED_FUNCTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z]+)\^([0-9]+)\(([^()]+)\)").unwrap());

/// Consolidate the two surface forms of a function raised to a power into
/// the single canonical `func^power arg` shape:
/// - `(sinx)^2`  -> `sin^2x`
/// - `sin^2(x)`  -> `sin^2x`
///
/// The two rewrites run in this relative order; each one's output no longer
/// matches its own trigger, so they cannot re-fire each other.
fn consolidate_function_power(input: &str) -> String {
    let step = RE_PARENTHESIZED_POWER.replace_all(input, "${1}^${3}${2}");
    RE_POWERED_FUNCTION
        .replace_all(&step, "${1}^${2}${3}")
        .into_owned()
}

static RE_DIV_PLAIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z0-9]+)/([a-z0-9]+)").unwrap());
static RE_DIV_LEFT_PAREN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([a-z0-9]+)\)/([a-z0-9]+)").unwrap());
static RE_DIV_RIGHT_PAREN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z0-9]+)/\(([a-z0-9]+)\)").unwrap());
static RE_DIV_BOTH_PAREN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([a-z0-9]+)\)/\(([a-z0-9]+)\)").unwrap());

fn collapse_same_token(re: &Regex, input: &str, replacement: &str) -> String {
    re.replace_all(input, |caps: &Captures| {
        if caps[1] == caps[2] {
            replacement.replace("$1", &caps[1])
        } else {
            caps[0].to_string()
        }
    })
    .into_owned()
}

/// Collapse `A/A` to `1` when both sides are the same letters-and-digits
/// token, covering all four parenthesization combinations. The `regex` crate
/// has no backreferences, so both sides are captured and compared here.
fn collapse_self_division(input: &str) -> String {
    let mut text = collapse_same_token(&RE_DIV_BOTH_PAREN, input, "1");
    text = collapse_same_token(&RE_DIV_LEFT_PAREN, &text, "1");
    text = collapse_same_token(&RE_DIV_RIGHT_PAREN, &text, "1");
    collapse_same_token(&RE_DIV_PLAIN, &text, "1")
}

static RE_MUL_SELF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z0-9]+)\*([a-z0-9]+)").unwrap());

/// Collapse `A*A` to `A^2` when both sides are the same token.
fn collapse_self_multiplication(input: &str) -> String {
    collapse_same_token(&RE_MUL_SELF, input, "$1^2")
}

static RE_SINGLE_VAR_PARENS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([a-z])\)\^").unwrap());

/// Drop parentheses around a single-character base followed by an exponent
/// marker: `(k)^2` -> `k^2`.
fn drop_single_variable_parens(input: &str) -> String {
    RE_SINGLE_VAR_PARENS
        .replace_all(input, "${1}^")
        .into_owned()
}

static RE_POWER_ONE_LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\^1([a-z])").unwrap());
static RE_POWER_ONE_PAREN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\^1\(").unwrap());

/// Strip a literal `^1` in front of a letter or an opening parenthesis:
/// `x^1y` -> `xy`, `x^1(` -> `x(`.
///
/// Multi-digit exponents such as `^12` are untouched: the patterns require
/// the character after the `1` to be a letter or `(`, which is exactly the
/// negative-lookahead-on-digit the original rules expressed.
fn elide_power_of_one(input: &str) -> String {
    let step = RE_POWER_ONE_LETTER.replace_all(input, "${1}");
    RE_POWER_ONE_PAREN.replace_all(&step, "(").into_owned()
}
