//! Aggregate helpers injected into every interpreter
//!
//! Helpers are plain JavaScript function declarations evaluated inside the
//! isolate, never host callbacks. None of them throw on empty input.

/// A helper visible to snippets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelperFunction {
    pub name: &'static str,
    pub signature: &'static str,
    pub summary: &'static str,
    /// Function declaration emitted into the program prelude
    pub source: &'static str,
}

pub const HELPERS: [HelperFunction; 5] = [
    HelperFunction {
        name: "avg",
        signature: "avg(numbers)",
        summary: "arithmetic mean, NaN for an empty array",
        source: r#"function avg(numbers) {
  if (!Array.isArray(numbers) || numbers.length === 0) return NaN;
  let total = 0;
  for (let i = 0; i < numbers.length; i++) total += numbers[i];
  return total / numbers.length;
}"#,
    },
    HelperFunction {
        name: "sum",
        signature: "sum(numbers)",
        summary: "sum of the values, 0 for an empty array",
        source: r#"function sum(numbers) {
  if (!Array.isArray(numbers)) return 0;
  let total = 0;
  for (let i = 0; i < numbers.length; i++) total += numbers[i];
  return total;
}"#,
    },
    HelperFunction {
        name: "max",
        signature: "max(numbers)",
        summary: "largest value, NaN for an empty array",
        source: r#"function max(numbers) {
  if (!Array.isArray(numbers) || numbers.length === 0) return NaN;
  let best = -Infinity;
  for (let i = 0; i < numbers.length; i++) best = Math.max(best, numbers[i]);
  return best;
}"#,
    },
    HelperFunction {
        name: "min",
        signature: "min(numbers)",
        summary: "smallest value, NaN for an empty array",
        source: r#"function min(numbers) {
  if (!Array.isArray(numbers) || numbers.length === 0) return NaN;
  let best = Infinity;
  for (let i = 0; i < numbers.length; i++) best = Math.min(best, numbers[i]);
  return best;
}"#,
    },
    HelperFunction {
        name: "groupBy",
        signature: "groupBy(items, keyPath)",
        summary: "object mapping each key (dotted paths allowed) to the items that share it",
        source: r#"function groupBy(items, keyPath) {
  const groups = Object.create(null);
  if (!Array.isArray(items)) return groups;
  const path = String(keyPath).split('.');
  for (let i = 0; i < items.length; i++) {
    let value = items[i];
    for (let j = 0; j < path.length; j++) {
      if (value === null || value === undefined) {
        value = undefined;
        break;
      }
      value = value[path[j]];
    }
    const key = String(value);
    if (!(key in groups)) groups[key] = [];
    groups[key].push(items[i]);
  }
  return groups;
}"#,
    },
];

pub fn is_helper_name(name: &str) -> bool {
    HELPERS.iter().any(|helper| helper.name == name)
}

/// Every helper declaration, in order
pub fn prelude() -> String {
    HELPERS
        .iter()
        .map(|helper| helper.source)
        .collect::<Vec<_>>()
        .join("\n")
}

/// One line per helper, used in the tool description
pub fn describe() -> String {
    HELPERS
        .iter()
        .map(|helper| format!("- {}: {}", helper.signature, helper.summary))
        .collect::<Vec<_>>()
        .join("\n")
}
