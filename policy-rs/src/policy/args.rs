use std::collections::VecDeque;
use std::net::IpAddr;
use std::str::FromStr;

use bgp_attr::Asn;

/// Split a free-text field on runs of commas and whitespace. Blank tokens
/// are dropped, order and duplicates are kept.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Token cursor over one field value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Args(pub VecDeque<String>);

macro_rules! arg_parse_type {
    ($self:expr, $typ:ty) => {
        let item = $self.0.pop_front()?;
        match item.parse::<$typ>() {
            Ok(arg) => {
                return Some(arg);
            }
            Err(_) => {
                $self.0.push_front(item);
                return None;
            }
        }
    };
}

impl Args {
    pub fn from_raw(raw: &str) -> Self {
        Args(parse_list(raw).into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Next token without consuming it.
    pub fn peek(&self) -> Option<&str> {
        self.0.front().map(|s| s.as_str())
    }

    pub fn string(&mut self) -> Option<String> {
        self.0.pop_front()
    }

    pub fn u8(&mut self) -> Option<u8> {
        arg_parse_type!(self, u8);
    }

    pub fn u32(&mut self) -> Option<u32> {
        arg_parse_type!(self, u32);
    }

    pub fn addr(&mut self) -> Option<IpAddr> {
        arg_parse_type!(self, IpAddr);
    }

    pub fn asn(&mut self) -> Option<Asn> {
        arg_parse_type!(self, Asn);
    }

    pub fn boolean(&mut self) -> Option<bool> {
        arg_parse_type!(self, bool);
    }

    pub fn parse<T: FromStr>(&mut self) -> Option<T> {
        arg_parse_type!(self, T);
    }

    /// Remaining tokens, in order.
    pub fn rest(&mut self) -> Vec<String> {
        self.0.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_list_mixed_separators() {
        assert_eq!(
            parse_list("65001, 65001  65002"),
            vec!["65001", "65001", "65002"]
        );
        assert_eq!(parse_list(",,a,\tb\n,c,"), vec!["a", "b", "c"]);
    }

    #[test]
    fn parse_list_blank() {
        assert!(parse_list("").is_empty());
        assert!(parse_list("  \t ").is_empty());
        assert!(parse_list(" , ,").is_empty());
    }

    #[test]
    fn typed_pop_keeps_token_on_failure() {
        let mut args = Args::from_raw("abc 10");
        assert_eq!(args.u32(), None);
        assert_eq!(args.peek(), Some("abc"));
        assert_eq!(args.string(), Some("abc".to_string()));
        assert_eq!(args.u32(), Some(10));
        assert!(args.is_empty());
    }

    #[test]
    fn typed_pop_values() {
        let mut args = Args::from_raw("192.0.2.1 2001:db8::1 1.10 true");
        assert_eq!(args.addr(), Some("192.0.2.1".parse().unwrap()));
        assert_eq!(args.addr(), Some("2001:db8::1".parse().unwrap()));
        assert_eq!(args.asn(), Some(Asn(65546)));
        assert_eq!(args.boolean(), Some(true));
        assert_eq!(args.len(), 0);
    }
}
