//! Lookups of event attributes in executed txs.
//!
//! Older nodes report events per message in `logs`, newer ones only in the flat `events` list.
//! Both are consulted, preferring `logs` so that the same event is never counted twice.

use cosmrs::proto::cosmos::base::abci::v1beta1::TxResponse;

pub const STORE_CODE: &str = "store_code";
pub const CODE_ID: &str = "code_id";
pub const INSTANTIATE: &str = "instantiate";
pub const CONTRACT_ADDRESS: &str = "_contract_address";
pub const POLL_STARTED: &str = "wasm-messages_poll_started";
pub const POLL_ID: &str = "poll_id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub event: String,
    pub key: String,
    pub value: String,
}

pub fn attributes(response: &TxResponse) -> Vec<Attribute> {
    let from_logs: Vec<_> = response
        .logs
        .iter()
        .flat_map(|log| log.events.iter())
        .flat_map(|event| {
            event.attributes.iter().map(|attr| Attribute {
                event: event.r#type.clone(),
                key: attr.key.clone(),
                value: attr.value.clone(),
            })
        })
        .collect();

    if !from_logs.is_empty() {
        return from_logs;
    }

    response
        .events
        .iter()
        .flat_map(|event| {
            event.attributes.iter().map(|attr| Attribute {
                event: event.r#type.clone(),
                key: String::from_utf8_lossy(AsRef::<[u8]>::as_ref(&attr.key)).into_owned(),
                value: String::from_utf8_lossy(AsRef::<[u8]>::as_ref(&attr.value)).into_owned(),
            })
        })
        .collect()
}

/// All values of `key` in events of type `event`, in emission order.
pub fn attribute_values(response: &TxResponse, event: &str, key: &str) -> Vec<String> {
    attributes(response)
        .into_iter()
        .filter(|attr| attr.event == event && attr.key == key)
        .map(|attr| attr.value)
        .collect()
}

pub fn first_attribute(response: &TxResponse, event: &str, key: &str) -> Option<String> {
    attribute_values(response, event, key).into_iter().next()
}

/// Ids of the polls a `VerifyMessages` tx started. Wasm event values are JSON encoded, so string
/// ids come wrapped in quotes.
pub fn poll_ids(response: &TxResponse) -> Vec<String> {
    attribute_values(response, POLL_STARTED, POLL_ID)
        .into_iter()
        .map(|id| id.trim_matches('"').to_string())
        .collect()
}

#[cfg(test)]
pub mod test_utils {
    use cosmrs::proto::cosmos::base::abci::v1beta1::{
        AbciMessageLog, Attribute, StringEvent, TxResponse,
    };

    /// A tx response whose single message log carries the given `(event, key, value)` triples.
    pub fn tx_response_with_events(events: &[(&str, &str, &str)]) -> TxResponse {
        TxResponse {
            txhash: "ABCDEF".to_string(),
            logs: vec![AbciMessageLog {
                msg_index: 0,
                log: String::new(),
                events: events
                    .iter()
                    .map(|(event, key, value)| StringEvent {
                        r#type: event.to_string(),
                        attributes: vec![Attribute {
                            key: key.to_string(),
                            value: value.to_string(),
                        }],
                    })
                    .collect(),
            }],
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use cosmrs::proto::cosmos::base::abci::v1beta1::TxResponse;

    use super::test_utils::tx_response_with_events;
    use super::*;

    #[test]
    fn finds_the_stored_code_id() {
        let response = tx_response_with_events(&[
            ("message", "action", "/cosmwasm.wasm.v1.MsgStoreCode"),
            (STORE_CODE, CODE_ID, "42"),
        ]);

        assert_eq!(
            first_attribute(&response, STORE_CODE, CODE_ID),
            Some("42".to_string())
        );
    }

    #[test]
    fn missing_attribute_yields_none() {
        let response = tx_response_with_events(&[("message", "action", "store")]);

        assert_eq!(first_attribute(&response, INSTANTIATE, CONTRACT_ADDRESS), None);
        assert_eq!(first_attribute(&TxResponse::default(), STORE_CODE, CODE_ID), None);
    }

    #[test]
    fn poll_ids_are_unquoted_and_ordered() {
        let response = tx_response_with_events(&[
            (POLL_STARTED, POLL_ID, "\"7\""),
            ("wasm", "action", "verify_messages"),
            (POLL_STARTED, POLL_ID, "\"8\""),
        ]);

        assert_eq!(poll_ids(&response), vec!["7", "8"]);
    }
}
