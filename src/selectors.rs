//! CSS locators for quotes.toscrape.com.

/// One quote block on a listing page.
pub const QUOTE: &str = ".quote";

/// Quote text inside a block.
pub const QUOTE_TEXT: &str = ".text";

/// Author name inside a block.
pub const QUOTE_AUTHOR: &str = ".author";

/// Tag line inside a block. Its text carries the [`TAGS_PREFIX`] literal
/// followed by whitespace-separated tag words.
pub const QUOTE_TAGS: &str = ".tags";

/// Literal prefix the tag line carries before the tag words.
pub const TAGS_PREFIX: &str = "Tags: ";

/// Link that opens the login form.
pub const LOGIN_LINK: &str = "a[href=\"/login\"]";

/// Username input on the login form.
pub const USERNAME_FIELD: &str = "#username";

/// Password input on the login form.
pub const PASSWORD_FIELD: &str = "#password";

/// Submit button on the login form.
pub const SUBMIT_BUTTON: &str = "input[value=\"Login\"]";

/// Link that is only present while a user is logged in.
pub const LOGOUT_LINK: &str = "a[href=\"/logout\"]";
