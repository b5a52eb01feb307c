//! Typed eWallet operations on top of a [`RequestExecutor`].

use serde::de::DeserializeOwned;

use super::ClientError;
use super::executor::{ApiRequest, RequestExecutor};
use crate::objects::params::{
    TransactionConsumptionActionParams, TransactionConsumptionParams, TransactionCreateParams,
    TransactionListParams, TransactionRequestCreateParams, TransactionRequestParams,
};
use crate::objects::{
    PaginationList, Setting, Transaction, TransactionConsumption, TransactionRequest, User,
    WalletList,
};

/// Endpoint paths of the client API.
pub mod endpoints {
    pub const GET_CURRENT_USER: &str = "me.get";
    pub const LOGOUT: &str = "me.logout";
    pub const GET_WALLETS: &str = "me.get_wallets";
    pub const GET_SETTINGS: &str = "me.get_settings";
    pub const CONSUME_TRANSACTION_REQUEST: &str = "me.consume_transaction_request";
    pub const APPROVE_TRANSACTION_CONSUMPTION: &str = "me.approve_transaction_consumption";
    pub const REJECT_TRANSACTION_CONSUMPTION: &str = "me.reject_transaction_consumption";
    pub const TRANSFER: &str = "me.transfer";
    pub const CREATE_TRANSACTION_REQUEST: &str = "me.create_transaction_request";
    pub const GET_TRANSACTION_REQUEST: &str = "me.get_transaction_request";
    pub const GET_TRANSACTIONS: &str = "me.get_transactions";
}

/// Serializes to the empty JSON object sent by parameterless calls.
type NoParams = serde_json::Map<String, serde_json::Value>;

/// Typed client for the eWallet **client API**.
///
/// Each method is a thin wrapper: build the body, run it through the
/// executor, decode the `data` object.
#[derive(Debug, Clone)]
pub struct EWalletClient<E> {
    executor: E,
}

impl<E: RequestExecutor> EWalletClient<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// `me.get` – the user owning the auth token.
    pub async fn get_current_user(&self) -> Result<User, ClientError> {
        self.call(endpoints::GET_CURRENT_USER, &NoParams::new()).await
    }

    /// `me.logout` – invalidate the auth token.
    ///
    /// Every later call with the same credentials fails.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let request = ApiRequest::post(endpoints::LOGOUT, &NoParams::new())?;
        self.executor.execute(request).await?;
        Ok(())
    }

    /// `me.get_wallets` – the current user's wallets with their balances.
    pub async fn get_wallets(&self) -> Result<WalletList, ClientError> {
        self.call(endpoints::GET_WALLETS, &NoParams::new()).await
    }

    pub async fn get_settings(&self) -> Result<Setting, ClientError> {
        self.call(endpoints::GET_SETTINGS, &NoParams::new()).await
    }

    /// `me.consume_transaction_request` – consume a transaction request.
    ///
    /// The returned consumption is usually `pending`; its `socket_topic`
    /// carries the rest of its lifecycle.
    pub async fn consume_transaction_request(
        &self,
        params: &TransactionConsumptionParams,
    ) -> Result<TransactionConsumption, ClientError> {
        self.call(endpoints::CONSUME_TRANSACTION_REQUEST, params).await
    }

    /// `me.approve_transaction_consumption` – approve a pending consumption.
    pub async fn approve_transaction_consumption(
        &self,
        id: &str,
    ) -> Result<TransactionConsumption, ClientError> {
        let params = TransactionConsumptionActionParams { id: id.to_owned() };
        self.call(endpoints::APPROVE_TRANSACTION_CONSUMPTION, &params)
            .await
    }

    /// `me.reject_transaction_consumption` – reject a pending consumption.
    pub async fn reject_transaction_consumption(
        &self,
        id: &str,
    ) -> Result<TransactionConsumption, ClientError> {
        let params = TransactionConsumptionActionParams { id: id.to_owned() };
        self.call(endpoints::REJECT_TRANSACTION_CONSUMPTION, &params)
            .await
    }

    /// `me.transfer` – transfer tokens between two addresses.
    pub async fn transfer(
        &self,
        params: &TransactionCreateParams,
    ) -> Result<Transaction, ClientError> {
        self.call(endpoints::TRANSFER, params).await
    }

    /// `me.create_transaction_request` – create a request others can consume.
    pub async fn create_transaction_request(
        &self,
        params: &TransactionRequestCreateParams,
    ) -> Result<TransactionRequest, ClientError> {
        self.call(endpoints::CREATE_TRANSACTION_REQUEST, params)
            .await
    }

    /// `me.get_transaction_request` – retrieve a transaction request by id.
    pub async fn retrieve_transaction_request(
        &self,
        formatted_id: &str,
    ) -> Result<TransactionRequest, ClientError> {
        let params = TransactionRequestParams {
            formatted_id: formatted_id.to_owned(),
        };
        self.call(endpoints::GET_TRANSACTION_REQUEST, &params).await
    }

    /// `me.get_transactions` – one page of the current user's transactions.
    pub async fn get_transactions(
        &self,
        params: &TransactionListParams,
    ) -> Result<PaginationList<Transaction>, ClientError> {
        self.call(endpoints::GET_TRANSACTIONS, params).await
    }

    async fn call<P, T>(&self, path: &'static str, params: &P) -> Result<T, ClientError>
    where
        P: serde::Serialize + Sync,
        T: DeserializeOwned,
    {
        let request = ApiRequest::post(path, params)?;
        let data = self.executor.execute(request).await?;
        serde_json::from_value(data).map_err(ClientError::Json)
    }
}
