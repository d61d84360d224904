//! Connection handshake parameters.
//!
//! A client names its room and username in the upgrade request's query
//! string: `/?roomId=<room>&username=<name>`. Both are required; an empty or
//! whitespace-only value counts as missing.

use url::form_urlencoded;

use crate::json_codec::ProtocolError;

/// Room and username a connection asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub room_id: String,
    pub username: String,
}

impl Handshake {
    pub fn new(room_id: impl Into<String>, username: impl Into<String>) -> Self {
        Handshake {
            room_id: room_id.into(),
            username: username.into(),
        }
    }

    /// Parse the (already split off) query part of the request URI.
    ///
    /// Repeated keys: the first non-empty value wins.
    pub fn from_query(query: Option<&str>) -> Result<Self, ProtocolError> {
        let mut room_id = None;
        let mut username = None;

        for (key, value) in form_urlencoded::parse(query.unwrap_or("").as_bytes()) {
            if value.trim().is_empty() {
                continue;
            }
            match key.as_ref() {
                "roomId" if room_id.is_none() => room_id = Some(value.into_owned()),
                "username" if username.is_none() => username = Some(value.into_owned()),
                _ => {}
            }
        }

        Ok(Handshake {
            room_id: room_id.ok_or(ProtocolError::MissingParameter("roomId"))?,
            username: username.ok_or(ProtocolError::MissingParameter("username"))?,
        })
    }

    /// Render as a query string (without the leading `?`).
    pub fn to_query(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("roomId", &self.room_id)
            .append_pair("username", &self.username)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_parameters() {
        let hs = Handshake::from_query(Some("roomId=sprint-42&username=alice")).unwrap();
        assert_eq!(hs, Handshake::new("sprint-42", "alice"));
    }

    #[test]
    fn decodes_percent_escapes() {
        let hs = Handshake::from_query(Some("username=J%C3%BCrgen+K&roomId=a%2Fb")).unwrap();
        assert_eq!(hs.room_id, "a/b");
        assert_eq!(hs.username, "Jürgen K");
    }

    #[test]
    fn missing_or_blank_is_rejected() {
        assert!(matches!(
            Handshake::from_query(None),
            Err(ProtocolError::MissingParameter("roomId"))
        ));
        assert!(matches!(
            Handshake::from_query(Some("roomId=r1")),
            Err(ProtocolError::MissingParameter("username"))
        ));
        assert!(matches!(
            Handshake::from_query(Some("roomId=&username=bob")),
            Err(ProtocolError::MissingParameter("roomId"))
        ));
        assert!(matches!(
            Handshake::from_query(Some("roomId=r1&username=%20%20")),
            Err(ProtocolError::MissingParameter("username"))
        ));
    }

    #[test]
    fn query_string_survives_a_trip() {
        let hs = Handshake::new("team room", "ana&bo");
        assert_eq!(Handshake::from_query(Some(&hs.to_query())).unwrap(), hs);
    }
}
