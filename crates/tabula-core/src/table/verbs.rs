use tracing::debug;

use super::{Diagnostic, Table};

/// Every verb `apply` understands.
pub const VERBS: &[&str] = &[
    "add", "arr", "ditto", "dp", "dup", "filter", "gen", "group", "label", "levels", "noblanks",
    "nospace", "pivot", "pop", "push", "roll", "rule", "sf", "shuffle", "sort", "tap", "uniq",
    "unwrap", "unzip", "wrap", "xp", "zip",
];

pub fn is_verb(word: &str) -> bool {
    VERBS.contains(&word.to_lowercase().as_str())
}

impl Table {
    /// Run one verb with its argument string (possibly empty).
    pub fn apply(&mut self, verb: &str, arg: &str) {
        let verb = verb.trim().to_lowercase();
        debug!(verb, arg, rows = self.rows(), cols = self.cols(), "apply");
        match verb.as_str() {
            "add" => self.add_footer(arg),
            "arr" => self.arrange(arg),
            "ditto" => self.ditto(),
            "dp" => self.decimal_places(arg),
            "dup" => self.duplicate(arg),
            "filter" => self.filter(arg),
            "gen" => self.generate(arg),
            "group" => self.group(arg),
            "label" => self.label(),
            "levels" => self.levels(arg),
            "noblanks" => self.remove_blanks(),
            "nospace" => self.remove_spaces(arg),
            "pivot" => self.pivot(arg),
            "pop" => self.pop(arg),
            "push" => self.push(arg),
            "roll" => self.roll(arg),
            "rule" => self.rule(arg),
            "sf" => self.significant_figures(arg),
            "shuffle" => self.shuffle(),
            "sort" => self.sort(arg),
            "tap" => self.tap(arg),
            "uniq" => self.uniq(arg),
            "unwrap" => self.unwrap(arg),
            "unzip" => self.unzip(arg),
            "wrap" => self.wrap(arg),
            "xp" => self.transpose(),
            "zip" => self.zip(arg),
            _ => self.report(Diagnostic::Unknown(verb)),
        }
    }

    /// Run a command line of verbs. Each verb takes the words up to the next
    /// verb as its argument, so `sort b uniq` sorts on `b` then drops
    /// duplicates, and `filter b > 10` passes `b > 10` to `filter`.
    pub fn run<'a>(&mut self, words: impl IntoIterator<Item = &'a str>) {
        let mut current: Option<(&str, Vec<&str>)> = None;
        for word in words {
            if is_verb(word) {
                if let Some((verb, args)) = current.take() {
                    self.apply(verb, &args.join(" "));
                }
                current = Some((word, Vec::new()));
                continue;
            }
            match &mut current {
                Some((_, args)) => args.push(word),
                None => self.report(Diagnostic::Unknown(word.to_string())),
            }
        }
        if let Some((verb, args)) = current {
            self.apply(verb, &args.join(" "));
        }
    }
}
