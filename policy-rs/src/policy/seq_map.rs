// Rules are kept in a map keyed by sequence and written out as an ordered
// list of rule records.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::{Deserializer, SeqAccess, Visitor};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

pub trait Sequenced {
    fn sequence(&self) -> u32;
}

pub fn serialize<S, R>(rules: &BTreeMap<u32, R>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    R: Serialize,
{
    let mut seq = serializer.serialize_seq(Some(rules.len()))?;
    for rule in rules.values() {
        seq.serialize_element(rule)?;
    }
    seq.end()
}

pub fn deserialize<'de, D, R>(deserializer: D) -> Result<BTreeMap<u32, R>, D::Error>
where
    D: Deserializer<'de>,
    R: Deserialize<'de> + Sequenced,
{
    struct RulesVisitor<R>(PhantomData<R>);

    impl<'de, R> Visitor<'de> for RulesVisitor<R>
    where
        R: Deserialize<'de> + Sequenced,
    {
        type Value = BTreeMap<u32, R>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "a list of rules")
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut rules = BTreeMap::new();
            while let Some(rule) = seq.next_element::<R>()? {
                let sequence = rule.sequence();
                if rules.insert(sequence, rule).is_some() {
                    return Err(serde::de::Error::custom(format!(
                        "duplicate rule sequence {}",
                        sequence
                    )));
                }
            }
            Ok(rules)
        }
    }

    deserializer.deserialize_seq(RulesVisitor(PhantomData))
}
