use regex::Regex;
use std::sync::OnceLock;

fn mod_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bmod\b").expect("mod regex must compile"))
}

fn pyth_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([A-Za-z_][A-Za-z0-9_]*)\s*\+\+\s*([A-Za-z_][A-Za-z0-9_]*)")
            .expect("pythagorean add regex must compile")
    })
}

/// Apply the formula shorthands before tokenizing:
/// `<>` becomes `!=`, the word `mod` becomes `%`, `p++q` becomes
/// `pyth_add(p,q)` and a lone `=` becomes `==`.
///
/// Text inside string literals is left alone.
pub fn preprocess_formula(formula: &str) -> String {
    let rewrite = |seg: &str| {
        let seg = seg.replace("<>", "!=");
        let seg = mod_re().replace_all(&seg, "%");
        let seg = pyth_re().replace_all(&seg, "pyth_add($1,$2)");
        double_lone_equals(&seg)
    };

    let bytes = formula.as_bytes();
    let mut out = String::new();
    let mut seg_start = 0;
    let mut quote: Option<u8> = None;
    let mut backslashes = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                backslashes += 1;
                i += 1;
                continue;
            }
            if b == q && backslashes.is_multiple_of(2) {
                out.push_str(&formula[seg_start..=i]);
                quote = None;
                seg_start = i + 1;
            }
            backslashes = 0;
            i += 1;
            continue;
        }

        if b == b'"' || b == b'\'' {
            out.push_str(&rewrite(&formula[seg_start..i]));
            quote = Some(b);
            seg_start = i;
            backslashes = 0;
        }
        i += 1;
    }

    if seg_start < formula.len() {
        if quote.is_some() {
            out.push_str(&formula[seg_start..]);
        } else {
            out.push_str(&rewrite(&formula[seg_start..]));
        }
    }

    out
}

fn double_lone_equals(seg: &str) -> String {
    let chars: Vec<char> = seg.chars().collect();
    let mut out = String::with_capacity(seg.len() + 2);
    for (i, &c) in chars.iter().enumerate() {
        out.push(c);
        if c != '=' {
            continue;
        }
        let prev = i.checked_sub(1).map(|j| chars[j]);
        let next = chars.get(i + 1).copied();
        let paired = matches!(prev, Some('<' | '>' | '=' | '!')) || next == Some('=');
        if !paired {
            out.push('=');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_equal_spelling() {
        assert_eq!(preprocess_formula("a<>b"), "a!=b");
    }

    #[test]
    fn test_mod_word() {
        assert_eq!(preprocess_formula("a mod 3"), "a % 3");
        assert_eq!(preprocess_formula("model"), "model");
    }

    #[test]
    fn test_pythagorean_add() {
        assert_eq!(preprocess_formula("a++b"), "pyth_add(a,b)");
        assert_eq!(preprocess_formula("x ++ y + 1"), "pyth_add(x,y) + 1");
    }

    #[test]
    fn test_lone_equals_doubles() {
        assert_eq!(preprocess_formula("a=1"), "a==1");
        assert_eq!(preprocess_formula("a==1"), "a==1");
        assert_eq!(preprocess_formula("a<=1"), "a<=1");
        assert_eq!(preprocess_formula("a!=1"), "a!=1");
    }

    #[test]
    fn test_strings_untouched() {
        assert_eq!(preprocess_formula("a + \"x=y mod z\""), "a + \"x=y mod z\"");
        assert_eq!(preprocess_formula("'<>' + b<>c"), "'<>' + b!=c");
    }

    #[test]
    fn test_unterminated_string_kept_verbatim() {
        assert_eq!(preprocess_formula("a='b=c"), "a=='b=c");
    }
}
