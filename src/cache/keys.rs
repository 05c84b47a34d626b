//! Cache key derivation.
//!
//! A key is the bracketed locator followed by the bracketed body, e.g.
//! `[/users/1][]` for a body-less request.

use serde_json::Value;

use super::RequestIdentity;

/// Render a key component: strings verbatim, other JSON compact, absent empty.
fn component(value: Option<&Value>) -> String {
    match value {
        None => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

pub fn derive_key(identity: &RequestIdentity) -> String {
    let body = component(identity.body.as_ref());
    let mut key = String::with_capacity(identity.locator.len() + body.len() + 4);
    key.push('[');
    key.push_str(&identity.locator);
    key.push_str("][");
    key.push_str(&body);
    key.push(']');
    key
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn absent_body_renders_empty() {
        let identity = RequestIdentity::new("https://api.test/items", None);
        assert_eq!(derive_key(&identity), "[https://api.test/items][]");
    }

    #[test]
    fn string_body_is_used_verbatim() {
        let identity = RequestIdentity::new("/items", Some(Value::String("{\"a\":1}".into())));
        assert_eq!(derive_key(&identity), "[/items][{\"a\":1}]");
    }

    #[test]
    fn structured_body_is_serialized() {
        let identity = RequestIdentity::new("/items", Some(json!({"a": 1})));
        assert_eq!(derive_key(&identity), "[/items][{\"a\":1}]");
    }

    #[test]
    fn serialized_and_raw_string_bodies_collide() {
        let raw = RequestIdentity::new("/items", Some(json!([1, 2])));
        let encoded = RequestIdentity::new("/items", Some(Value::String("[1,2]".into())));
        assert_eq!(derive_key(&raw), derive_key(&encoded));
    }

    #[test]
    fn locator_and_body_are_both_significant() {
        let a = RequestIdentity::new("/a", Some(json!(1)));
        let b = RequestIdentity::new("/b", Some(json!(1)));
        let c = RequestIdentity::new("/a", Some(json!(2)));
        assert_ne!(derive_key(&a), derive_key(&b));
        assert_ne!(derive_key(&a), derive_key(&c));
    }
}
