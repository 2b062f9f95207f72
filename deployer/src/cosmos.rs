use std::time::Duration;

use async_trait::async_trait;
use cosmrs::proto::cosmos::auth::v1beta1::query_client::QueryClient as AuthQueryClient;
use cosmrs::proto::cosmos::auth::v1beta1::{
    BaseAccount, QueryAccountRequest, QueryAccountResponse,
};
use cosmrs::proto::cosmos::tx::v1beta1::service_client::ServiceClient;
use cosmrs::proto::cosmos::tx::v1beta1::{
    BroadcastTxRequest, BroadcastTxResponse, GetTxRequest, GetTxResponse, SimulateRequest,
    SimulateResponse,
};
use cosmrs::proto::cosmwasm::wasm::v1::query_client::QueryClient as WasmQueryClient;
use cosmrs::proto::cosmwasm::wasm::v1::{
    ContractInfo, QueryCodesRequest, QueryCodesResponse, QueryContractInfoRequest,
    QueryContractInfoResponse, QueryRawContractStateRequest, QueryRawContractStateResponse,
    QuerySmartContractStateRequest, QuerySmartContractStateResponse,
};
use cosmrs::proto::traits::MessageExt;
use cosmrs::{AccountId, Any};
use error_stack::{report, Result, ResultExt};
use mockall::mock;
use prost::Message;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tonic::transport::{Channel, Endpoint};
use tonic::Response;

use crate::broadcaster::tx::Tx;
use crate::report::ErrorExt;

/// Raw storage key under which cw2 keeps the contract name and version.
const CW2_CONTRACT_INFO_KEY: &[u8] = b"contract_info";

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to connect to the grpc endpoint")]
    GrpcConnection(#[from] tonic::transport::Error),
    #[error("failed to make the grpc request")]
    GrpcRequest(#[from] tonic::Status),
    #[error("failed building tx")]
    TxBuilding,
    #[error("gas info is missing in the query response")]
    GasInfoMissing,
    #[error("account is missing in the query response")]
    AccountMissing,
    #[error("contract info is missing in the query response")]
    ContractInfoMissing,
    #[error("failed to encode the contract query")]
    QueryEncoding,
    #[error("failed to decode the query response")]
    MalformedResponse,
}

mock! {
    #[derive(Debug)]
    pub CosmosClient{}

    impl Clone for CosmosClient {
        fn clone(&self) -> Self;
    }

    #[async_trait]
    impl CosmosClient for CosmosClient {
        async fn broadcast_tx(&mut self, req: BroadcastTxRequest) -> Result<BroadcastTxResponse, Error>;
        async fn simulate(&mut self, req: SimulateRequest) -> Result<SimulateResponse, Error>;
        async fn tx(&mut self, req: GetTxRequest) -> Result<GetTxResponse, Error>;

        async fn account(&mut self, req: QueryAccountRequest) -> Result<QueryAccountResponse, Error>;

        async fn smart_contract_state(&mut self, req: QuerySmartContractStateRequest) -> Result<QuerySmartContractStateResponse, Error>;
        async fn raw_contract_state(&mut self, req: QueryRawContractStateRequest) -> Result<QueryRawContractStateResponse, Error>;
        async fn contract_info(&mut self, req: QueryContractInfoRequest) -> Result<QueryContractInfoResponse, Error>;
        async fn codes(&mut self, req: QueryCodesRequest) -> Result<QueryCodesResponse, Error>;
    }
}

#[async_trait]
pub trait CosmosClient {
    async fn broadcast_tx(&mut self, req: BroadcastTxRequest)
        -> Result<BroadcastTxResponse, Error>;
    async fn simulate(&mut self, req: SimulateRequest) -> Result<SimulateResponse, Error>;
    async fn tx(&mut self, req: GetTxRequest) -> Result<GetTxResponse, Error>;

    async fn account(&mut self, req: QueryAccountRequest) -> Result<QueryAccountResponse, Error>;

    async fn smart_contract_state(
        &mut self,
        req: QuerySmartContractStateRequest,
    ) -> Result<QuerySmartContractStateResponse, Error>;
    async fn raw_contract_state(
        &mut self,
        req: QueryRawContractStateRequest,
    ) -> Result<QueryRawContractStateResponse, Error>;
    async fn contract_info(
        &mut self,
        req: QueryContractInfoRequest,
    ) -> Result<QueryContractInfoResponse, Error>;
    async fn codes(&mut self, req: QueryCodesRequest) -> Result<QueryCodesResponse, Error>;
}

/// gRPC implementation of [CosmosClient]. Clones share the underlying channel, so every signer
/// of a load test can hold its own copy without opening new connections.
#[derive(Clone)]
pub struct CosmosGrpcClient {
    auth: AuthQueryClient<Channel>,
    service: ServiceClient<Channel>,
    wasm: WasmQueryClient<Channel>,
}

impl CosmosGrpcClient {
    pub async fn new(url: &str, timeout: Duration) -> Result<Self, Error> {
        let endpoint: Endpoint = url.parse().map_err(ErrorExt::into_report)?;
        let conn = endpoint
            .timeout(timeout)
            .connect_timeout(timeout)
            .connect()
            .await
            .map_err(ErrorExt::into_report)?;

        Ok(Self {
            auth: AuthQueryClient::new(conn.clone()),
            service: ServiceClient::new(conn.clone()),
            wasm: WasmQueryClient::new(conn),
        })
    }
}

#[async_trait]
impl CosmosClient for CosmosGrpcClient {
    async fn broadcast_tx(
        &mut self,
        req: BroadcastTxRequest,
    ) -> Result<BroadcastTxResponse, Error> {
        self.service
            .broadcast_tx(req)
            .await
            .map(Response::into_inner)
            .map_err(ErrorExt::into_report)
    }

    async fn simulate(&mut self, req: SimulateRequest) -> Result<SimulateResponse, Error> {
        self.service
            .simulate(req)
            .await
            .map(Response::into_inner)
            .map_err(ErrorExt::into_report)
    }

    async fn tx(&mut self, req: GetTxRequest) -> Result<GetTxResponse, Error> {
        self.service
            .get_tx(req)
            .await
            .map(Response::into_inner)
            .map_err(ErrorExt::into_report)
    }

    async fn account(&mut self, req: QueryAccountRequest) -> Result<QueryAccountResponse, Error> {
        self.auth
            .account(req)
            .await
            .map(Response::into_inner)
            .map_err(ErrorExt::into_report)
    }

    async fn smart_contract_state(
        &mut self,
        req: QuerySmartContractStateRequest,
    ) -> Result<QuerySmartContractStateResponse, Error> {
        self.wasm
            .smart_contract_state(req)
            .await
            .map(Response::into_inner)
            .map_err(ErrorExt::into_report)
    }

    async fn raw_contract_state(
        &mut self,
        req: QueryRawContractStateRequest,
    ) -> Result<QueryRawContractStateResponse, Error> {
        self.wasm
            .raw_contract_state(req)
            .await
            .map(Response::into_inner)
            .map_err(ErrorExt::into_report)
    }

    async fn contract_info(
        &mut self,
        req: QueryContractInfoRequest,
    ) -> Result<QueryContractInfoResponse, Error> {
        self.wasm
            .contract_info(req)
            .await
            .map(Response::into_inner)
            .map_err(ErrorExt::into_report)
    }

    async fn codes(&mut self, req: QueryCodesRequest) -> Result<QueryCodesResponse, Error> {
        self.wasm
            .codes(req)
            .await
            .map(Response::into_inner)
            .map_err(ErrorExt::into_report)
    }
}

/// Name and version a contract stored through cw2 at instantiation or migration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ContractVersion {
    pub contract: String,
    pub version: String,
}

pub async fn estimate_gas<T>(
    client: &mut T,
    msgs: Vec<Any>,
    pub_key: cosmrs::crypto::PublicKey,
    acc_sequence: u64,
) -> Result<u64, Error>
where
    T: CosmosClient,
{
    let tx_bytes = Tx::builder()
        .msgs(msgs)
        .pub_key(pub_key)
        .acc_sequence(acc_sequence)
        .build()
        .with_dummy_sig()
        .change_context(Error::TxBuilding)?
        .to_bytes()
        .change_context(Error::TxBuilding)?;

    #[allow(deprecated)]
    client
        .simulate(SimulateRequest { tx: None, tx_bytes })
        .await
        .and_then(|res| {
            res.gas_info
                .map(|info| info.gas_used)
                .ok_or(report!(Error::GasInfoMissing))
        })
}

pub async fn account<T>(client: &mut T, address: &AccountId) -> Result<BaseAccount, Error>
where
    T: CosmosClient,
{
    client
        .account(QueryAccountRequest {
            address: address.to_string(),
        })
        .await
        .and_then(|res| res.account.ok_or(report!(Error::AccountMissing)))
        .and_then(decode_base_account)
}

fn decode_base_account(account: Any) -> Result<BaseAccount, Error> {
    BaseAccount::decode(&account.value[..]).change_context(Error::MalformedResponse)
}

/// Runs a smart query against `address` and decodes the JSON answer.
pub async fn query_contract<T, Q, R>(client: &mut T, address: &str, query: &Q) -> Result<R, Error>
where
    T: CosmosClient,
    Q: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let query_data = serde_json::to_vec(query).change_context(Error::QueryEncoding)?;

    let res = client
        .smart_contract_state(QuerySmartContractStateRequest {
            address: address.to_string(),
            query_data,
        })
        .await
        .attach_printable_lazy(|| format!("contract: {address}"))?;

    serde_json::from_slice(&res.data).change_context(Error::MalformedResponse)
}

pub async fn contract_info<T>(client: &mut T, address: &str) -> Result<ContractInfo, Error>
where
    T: CosmosClient,
{
    client
        .contract_info(QueryContractInfoRequest {
            address: address.to_string(),
        })
        .await
        .attach_printable_lazy(|| format!("contract: {address}"))
        .and_then(|res| res.contract_info.ok_or(report!(Error::ContractInfoMissing)))
}

/// Reads the cw2 version entry; `None` for contracts that do not store one.
pub async fn contract_version<T>(
    client: &mut T,
    address: &str,
) -> Result<Option<ContractVersion>, Error>
where
    T: CosmosClient,
{
    let res = client
        .raw_contract_state(QueryRawContractStateRequest {
            address: address.to_string(),
            query_data: CW2_CONTRACT_INFO_KEY.to_vec(),
        })
        .await
        .attach_printable_lazy(|| format!("contract: {address}"))?;

    if res.data.is_empty() {
        return Ok(None);
    }

    serde_json::from_slice(&res.data)
        .map(Some)
        .change_context(Error::MalformedResponse)
}
