/// serde functions for handling big integers as decimal strings, such as `U256`, `I256`, `u128`
/// and `i128`. JSON numbers are accepted on input as long as they are integers.
pub mod decimal {
    use std::{fmt::Display, str::FromStr};

    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(serde_json::Number),
    }

    /// Serialize a number as its decimal string representation
    pub fn serialize<S, T>(x: &T, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Display,
    {
        s.serialize_str(&x.to_string())
    }

    /// Deserialize a decimal string or an integer JSON number
    pub fn deserialize<'de, T, D>(d: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: FromStr,
        T::Err: Display,
    {
        let raw = match StringOrNumber::deserialize(d)? {
            StringOrNumber::String(value) => value,
            StringOrNumber::Number(value) => value.to_string(),
        };
        T::from_str(raw.trim()).map_err(|e| serde::de::Error::custom(format!("{raw}: {e}")))
    }
}

/// serde functions for handling an optional big integer as decimal string
pub mod decimal_option {
    use std::{fmt::Display, str::FromStr};

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S, T>(x: &Option<T>, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Display,
    {
        match x {
            Some(x) => s.serialize_str(&x.to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(d: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: FromStr,
        T::Err: Display,
    {
        #[derive(Deserialize)]
        struct Wrapper<T>(#[serde(with = "super::decimal")] T)
        where
            T: FromStr,
            T::Err: Display;

        let value: Option<Wrapper<T>> = Option::deserialize(d)?;
        Ok(value.map(|Wrapper(inner)| inner))
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{I256, U256};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct TestStruct {
        #[serde(with = "super::decimal")]
        price: U256,
        #[serde(with = "super::decimal")]
        amount: I256,
        #[serde(with = "super::decimal")]
        net: i128,
        #[serde(default, with = "super::decimal_option")]
        limit: Option<U256>,
    }

    #[test]
    fn decimal_serialize_deserialize() {
        let test_struct = TestStruct {
            price: U256::from(79228162514264337593543950336u128),
            amount: I256::try_from(-42i64).unwrap(),
            net: -7,
            limit: Some(U256::from(1u64)),
        };

        let serialized = serde_json::to_string(&test_struct).unwrap();
        assert_eq!(
            serialized,
            "{\"price\":\"79228162514264337593543950336\",\"amount\":\"-42\",\"net\":\"-7\",\"limit\":\"1\"}"
        );

        let deserialized: TestStruct = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized.price, test_struct.price);
        assert_eq!(deserialized.amount, test_struct.amount);
        assert_eq!(deserialized.net, -7);
        assert_eq!(deserialized.limit, Some(U256::from(1u64)));
    }

    #[test]
    fn decimal_accepts_numbers_and_missing_option() {
        let deserialized: TestStruct =
            serde_json::from_str("{\"price\":1000,\"amount\":-5,\"net\":12}").unwrap();

        assert_eq!(deserialized.price, U256::from(1000u64));
        assert_eq!(deserialized.amount, I256::try_from(-5i64).unwrap());
        assert_eq!(deserialized.net, 12);
        assert_eq!(deserialized.limit, None);
    }

    #[test]
    fn decimal_rejects_garbage() {
        let res: Result<TestStruct, _> =
            serde_json::from_str("{\"price\":\"0xzz\",\"amount\":\"1\",\"net\":\"1\"}");

        assert!(res.is_err());
    }
}
