//! Database schemas for factbook
//!
//! Defines the stored document structures for users, members, and facts.

mod fact;
mod member;
mod metadata;
mod user;

pub use fact::{FactDoc, FactPatch, FACT_COLLECTION};
pub use member::{MemberDoc, MemberPatch, MEMBER_COLLECTION};
pub use metadata::{Metadata, DELETED_FLAG};
pub use user::{normalize_email, validate_credentials, UserDoc, EMAIL_TAKEN, USER_COLLECTION};

/// Join messages into an English sentence: "a", "a and b", "a, b, and c"
pub fn to_sentence(messages: &[String]) -> String {
    match messages {
        [] => String::new(),
        [one] => one.clone(),
        [first, second] => format!("{} and {}", first, second),
        [rest @ .., last] => format!("{}, and {}", rest.join(", "), last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_sentence() {
        let msgs = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(to_sentence(&[]), "");
        assert_eq!(to_sentence(&msgs(&["a"])), "a");
        assert_eq!(to_sentence(&msgs(&["a", "b"])), "a and b");
        assert_eq!(to_sentence(&msgs(&["a", "b", "c"])), "a, b, and c");
    }
}
