// Character '_' has special meanings. It represents [,{}() ] and the beginning of
// the line(^) and the end of the line ($).

use regex::Regex;

const MAGIC_REGEXP: &str = "(^|[,{}() ]|$)";

fn magic_replace(s: &str) -> String {
    s.replace('_', MAGIC_REGEXP)
}

/// Compile a community or AS path expression.
pub fn regcomp(s: &str) -> Result<Regex, regex::Error> {
    Regex::new(&magic_replace(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_magic() {
        let source = "_100_";
        let replaced = magic_replace(source);
        assert_eq!(replaced, "(^|[,{}() ]|$)100(^|[,{}() ]|$)");
    }

    #[test]
    fn compile() {
        let re = regcomp("_65001_").unwrap();
        assert!(re.is_match("65002 65001 65003"));
        assert!(!re.is_match("650011"));
        assert!(regcomp("^65001:(").is_err());
    }
}
