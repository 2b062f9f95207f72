use std::time::Duration;

use cosmrs::proto::cosmos::base::abci::v1beta1::TxResponse;
use cosmrs::proto::cosmos::tx::v1beta1::{GetTxRequest, GetTxResponse};
use error_stack::{report, Report, Result};
use thiserror::Error;
use tokio::time;
use tracing::debug;

use crate::cosmos;

#[derive(Debug, PartialEq)]
pub enum TxStatus {
    Success,
    Failure,
}

impl From<u32> for TxStatus {
    fn from(code: u32) -> Self {
        match code {
            0 => Self::Success,
            _ => Self::Failure,
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed confirming tx due to tx not found: {tx_hash}")]
    Confirmation { tx_hash: String },
    #[error("failed confirming tx due to grpc error: {tx_hash}")]
    Grpc { tx_hash: String },
}

enum ConfirmationResult {
    Confirmed(Box<TxResponse>),
    NotFound,
    GrpcError(Report<cosmos::Error>),
}

/// Polls the node until the tx is included in a block or `attempts` run out.
pub async fn confirm_tx<T>(
    client: &mut T,
    tx_hash: &str,
    sleep: Duration,
    attempts: u32,
) -> Result<TxResponse, Error>
where
    T: cosmos::CosmosClient,
{
    for i in 0..attempts {
        let req = GetTxRequest {
            hash: tx_hash.to_string(),
        };

        match evaluate_tx_response(client.tx(req).await) {
            ConfirmationResult::Confirmed(tx) => return Ok(*tx),
            ConfirmationResult::NotFound if i == attempts.saturating_sub(1) => {
                return Err(report!(Error::Confirmation {
                    tx_hash: tx_hash.to_string()
                }))
            }
            ConfirmationResult::GrpcError(err) if i == attempts.saturating_sub(1) => {
                return Err(err.change_context(Error::Grpc {
                    tx_hash: tx_hash.to_string(),
                }))
            }
            _ => {
                debug!(tx_hash, attempt = i, "tx not found yet");
                time::sleep(sleep).await
            }
        }
    }

    Err(report!(Error::Confirmation {
        tx_hash: tx_hash.to_string()
    }))
}

fn evaluate_tx_response(response: Result<GetTxResponse, cosmos::Error>) -> ConfirmationResult {
    match response {
        Err(err) => ConfirmationResult::GrpcError(err),
        Ok(GetTxResponse {
            tx_response: None, ..
        }) => ConfirmationResult::NotFound,
        Ok(GetTxResponse {
            tx_response: Some(response),
            ..
        }) => ConfirmationResult::Confirmed(Box::new(response)),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use cosmrs::proto::cosmos::base::abci::v1beta1::TxResponse;
    use cosmrs::proto::cosmos::tx::v1beta1::{GetTxRequest, GetTxResponse};
    use error_stack::report;
    use mockall::predicate;

    use super::{confirm_tx, Error, TxStatus};
    use crate::cosmos::{self, MockCosmosClient};

    #[test]
    fn tx_status_from_code() {
        assert_eq!(TxStatus::from(0), TxStatus::Success);
        assert_eq!(TxStatus::from(5), TxStatus::Failure);
    }

    #[tokio::test(start_paused = true)]
    async fn should_confirm_successful_tx() {
        let tx_hash = "tx_hash".to_string();
        let tx_response = TxResponse {
            code: 0,
            txhash: tx_hash.clone(),
            ..Default::default()
        };
        let expected = tx_response.clone();

        let mut client = MockCosmosClient::new();
        client
            .expect_tx()
            .with(predicate::eq(GetTxRequest {
                hash: tx_hash.clone(),
            }))
            .return_once(move |_| {
                Ok(GetTxResponse {
                    tx_response: Some(tx_response),
                    ..Default::default()
                })
            });

        let actual = confirm_tx(&mut client, &tx_hash, Duration::from_secs(1), 3).await;

        assert_eq!(actual.unwrap(), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn should_retry_until_the_tx_is_found() {
        let mut client = MockCosmosClient::new();
        let mut calls = 0;
        client.expect_tx().times(3).returning(move |_| {
            calls += 1;
            match calls {
                1 => Err(report!(cosmos::Error::GrpcRequest(tonic::Status::not_found(
                    "tx not found"
                )))),
                2 => Ok(GetTxResponse::default()),
                _ => Ok(GetTxResponse {
                    tx_response: Some(TxResponse {
                        code: 5,
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
            }
        });

        let actual = confirm_tx(&mut client, "tx_hash", Duration::from_secs(1), 5).await;

        assert_eq!(TxStatus::from(actual.unwrap().code), TxStatus::Failure);
    }

    #[tokio::test(start_paused = true)]
    async fn should_fail_when_tx_is_never_found() {
        let mut client = MockCosmosClient::new();
        client
            .expect_tx()
            .times(3)
            .returning(|_| Ok(GetTxResponse::default()));

        let err = confirm_tx(&mut client, "tx_hash", Duration::from_secs(1), 3)
            .await
            .unwrap_err();

        assert!(matches!(
            err.current_context(),
            Error::Confirmation { tx_hash } if tx_hash == "tx_hash"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn should_fail_on_persistent_grpc_errors() {
        let mut client = MockCosmosClient::new();
        client.expect_tx().times(2).returning(|_| {
            Err(report!(cosmos::Error::GrpcRequest(tonic::Status::unavailable(
                "node down"
            ))))
        });

        let err = confirm_tx(&mut client, "tx_hash", Duration::from_secs(1), 2)
            .await
            .unwrap_err();

        assert!(matches!(err.current_context(), Error::Grpc { .. }));
    }
}
