use std::fmt;

use reqwest::Client;

/// Characters of the session id shown in debug output.
const ID_PREVIEW_CHARS: usize = 4;

/// An authenticated portal session.
///
/// The client owns the cookie jar the login filled, so every request made
/// through [`Session::client`] carries the session cookie. Clone is cheap and
/// all clones share the same jar.
#[derive(Clone)]
pub struct Session {
    id: String,
    client: Client,
}

impl Session {
    pub(crate) fn new(id: String, client: Client) -> Self {
        Self { id, client }
    }

    /// The identifier the portal expects in `sessionno` form fields.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let preview: String = self.id.chars().take(ID_PREVIEW_CHARS).collect();
        f.debug_struct("Session")
            .field("id", &format!("{}...", preview))
            .finish_non_exhaustive()
    }
}
