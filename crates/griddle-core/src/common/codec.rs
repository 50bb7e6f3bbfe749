//! JSON codec and message interpreter.
//!
//! Decoding is split in two stages:
//!
//! 1. [`decode`] turns raw bytes into a [`Message`], a plain string-keyed JSON
//!    map. It checks syntax only.
//! 2. [`interpret`] inspects the `"ingredient"` discriminator and converts the
//!    remaining fields into a typed [`Ingredient`].
//!
//! Conversion is permissive in the same places a struct decoder usually is:
//! unrecognised extra keys are ignored and a missing quantity converts to
//! zero. A present quantity of the wrong type, a negative count, or a
//! negative litre value is rejected.
//!
//! Encoding comes in two flavours. [`try_encode`] reports serialization
//! faults; [`encode`] swallows them and yields [`EMPTY_OBJECT`], so a bad
//! outbound payload can never tear down a transport loop.

use crate::{
    Error, Result,
    types::{Eggs, Flour, INGREDIENT_TAG, Ingredient, IngredientKind, Milk},
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

/// A decoded but uninterpreted inbound message.
pub type Message = Map<String, Value>;

/// Encoding emitted in place of a value that failed to serialize.
pub const EMPTY_OBJECT: &str = "{}";

/// Parses `bytes` as a JSON object.
///
/// # Errors
///
/// - [`Error::Decode`] if the bytes are not valid JSON.
/// - [`Error::NotAnObject`] if the JSON value is not a mapping.
pub fn decode(bytes: &[u8]) -> Result<Message> {
    match serde_json::from_slice::<Value>(bytes).map_err(Error::Decode)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::NotAnObject {
            found: json_type(&other),
        }),
    }
}

/// Converts a decoded message into a typed [`Ingredient`].
///
/// # Errors
///
/// - [`Error::UnknownIngredient`] if the discriminator is missing, not a
///   string, or names none of the known kinds.
/// - [`Error::FieldConversion`] if the quantity field does not convert.
pub fn interpret(message: Message) -> Result<Ingredient> {
    let kind = match message.get(INGREDIENT_TAG) {
        Some(Value::String(tag)) => {
            IngredientKind::from_wire(tag).ok_or_else(|| Error::UnknownIngredient {
                found: tag.clone(),
            })?
        }
        Some(other) => {
            return Err(Error::UnknownIngredient {
                found: other.to_string(),
            });
        }
        None => {
            return Err(Error::UnknownIngredient {
                found: format!("<missing \"{INGREDIENT_TAG}\" field>"),
            });
        }
    };

    match kind {
        IngredientKind::Eggs => convert::<Eggs>(kind, message).map(Ingredient::Eggs),
        IngredientKind::Flour => convert::<Flour>(kind, message).map(Ingredient::Flour),
        IngredientKind::Milk => {
            let milk = convert::<Milk>(kind, message)?;
            if !milk.litres.is_finite() || milk.litres < 0.0 {
                return Err(Error::FieldConversion {
                    ingredient: kind.as_str(),
                    reason: format!("litres must be a non-negative number, got {}", milk.litres),
                });
            }
            Ok(Ingredient::Milk(milk))
        }
    }
}

/// Decodes and interprets in one step.
pub fn decode_ingredient(bytes: &[u8]) -> Result<Ingredient> {
    interpret(decode(bytes)?)
}

/// Serializes `value` to JSON text.
///
/// # Errors
///
/// Returns [`Error::Encode`] if serialization fails.
pub fn try_encode<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Error::Encode)
}

/// Serializes `value` to JSON text, falling back to [`EMPTY_OBJECT`].
pub fn encode<T: Serialize + ?Sized>(value: &T) -> String {
    try_encode(value).unwrap_or_else(|_| EMPTY_OBJECT.to_owned())
}

fn convert<T: DeserializeOwned>(kind: IngredientKind, message: Message) -> Result<T> {
    serde_json::from_value(Value::Object(message)).map_err(|e| Error::FieldConversion {
        ingredient: kind.as_str(),
        reason: e.to_string(),
    })
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StatusEvent;
    use std::collections::BTreeMap;

    #[test]
    fn decodes_the_three_documented_shapes() {
        assert_eq!(
            decode_ingredient(br#"{"ingredient":"eggs","count":4}"#).unwrap(),
            Ingredient::eggs(4)
        );
        assert_eq!(
            decode_ingredient(br#"{"ingredient":"flour","grams":450}"#).unwrap(),
            Ingredient::flour(450)
        );
        assert_eq!(
            decode_ingredient(br#"{"ingredient":"milk","litres":1.5}"#).unwrap(),
            Ingredient::milk(1.5)
        );
    }

    #[test]
    fn decoder_does_not_validate_shape() {
        let message = decode(br#"{"ingredient":"butter","grams":"lots"}"#).unwrap();
        assert_eq!(message.len(), 2);
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        let err = decode(b"{\"ingredient\": ").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
        assert!(err.is_decode());
    }

    #[test]
    fn non_object_json_is_a_decode_error() {
        let err = decode(b"[1, 2, 3]").unwrap_err();
        assert!(matches!(err, Error::NotAnObject { found: "an array" }));
        assert!(err.is_decode());
    }

    #[test]
    fn unknown_discriminator_is_rejected() {
        let err = decode_ingredient(br#"{"ingredient":"butter","grams":10}"#).unwrap_err();
        assert!(matches!(err, Error::UnknownIngredient { ref found } if found == "butter"));
        assert!(!err.is_decode());

        let err = decode_ingredient(br#"{"count":2}"#).unwrap_err();
        assert!(matches!(err, Error::UnknownIngredient { .. }));

        let err = decode_ingredient(br#"{"ingredient":7}"#).unwrap_err();
        assert!(matches!(err, Error::UnknownIngredient { ref found } if found == "7"));
    }

    #[test]
    fn mistyped_fields_are_conversion_errors() {
        let err = decode_ingredient(br#"{"ingredient":"eggs","count":"four"}"#).unwrap_err();
        assert!(matches!(
            err,
            Error::FieldConversion {
                ingredient: "eggs",
                ..
            }
        ));

        let err = decode_ingredient(br#"{"ingredient":"flour","grams":-5}"#).unwrap_err();
        assert!(matches!(
            err,
            Error::FieldConversion {
                ingredient: "flour",
                ..
            }
        ));

        let err = decode_ingredient(br#"{"ingredient":"eggs","count":1.5}"#).unwrap_err();
        assert!(matches!(err, Error::FieldConversion { .. }));
    }

    #[test]
    fn negative_milk_is_a_conversion_error() {
        let err = decode_ingredient(br#"{"ingredient":"milk","litres":-0.1}"#).unwrap_err();
        assert!(matches!(
            err,
            Error::FieldConversion {
                ingredient: "milk",
                ..
            }
        ));
    }

    #[test]
    fn integer_litres_convert() {
        assert_eq!(
            decode_ingredient(br#"{"ingredient":"milk","litres":2}"#).unwrap(),
            Ingredient::milk(2.0)
        );
    }

    #[test]
    fn missing_quantity_converts_to_zero_and_extras_are_ignored() {
        assert_eq!(
            decode_ingredient(br#"{"ingredient":"eggs"}"#).unwrap(),
            Ingredient::eggs(0)
        );
        assert_eq!(
            decode_ingredient(br#"{"ingredient":"flour","grams":10,"brand":"acme"}"#).unwrap(),
            Ingredient::flour(10)
        );
    }

    #[test]
    fn encode_matches_wire_format() {
        assert_eq!(
            encode(&StatusEvent::PortionReady),
            r#"{"status":"pancake-ready"}"#
        );
        assert_eq!(
            encode(&StatusEvent::received(Ingredient::eggs(4))),
            r#"{"status":"ingredient-received","ingredient":{"ingredient":"eggs","count":4}}"#
        );
    }

    #[test]
    fn encode_falls_back_to_empty_object() {
        // JSON object keys must be strings; tuple keys cannot be serialized.
        let mut unencodable = BTreeMap::new();
        unencodable.insert((1_u8, 2_u8), 3_u8);

        assert!(matches!(try_encode(&unencodable), Err(Error::Encode(_))));
        assert_eq!(encode(&unencodable), EMPTY_OBJECT);
    }

    #[test]
    fn echoed_ingredient_reinterprets_to_itself() {
        let sent = Ingredient::flour(250);
        let echoed = decode_ingredient(encode(&sent).as_bytes()).unwrap();
        assert_eq!(echoed, sent);
    }
}
