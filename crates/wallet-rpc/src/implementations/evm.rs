//! EVM partition sub-API of [`RestClient`].

use crate::{EvmBalance, EvmNodeClient, RestClient, RpcError};
use alloy_primitives::Address;
use async_trait::async_trait;
use minicbor::{decode, Decode, Decoder};
use reqwest::StatusCode;
use wallet_types::codec::expect_array;
use wallet_types::payloads::evm::{CallEvmRequest, EvmProcessingDetails};

const EVM_API_PREFIX: &str = "evm";

/// `[balance, counter]`
struct BalanceResponse(EvmBalance);

impl<'b, C> Decode<'b, C> for BalanceResponse {
	fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> {
		expect_array(d, 2, "balance response")?;
		Ok(Self(EvmBalance {
			balance: d.str()?.to_string(),
			counter: d.u64()?,
		}))
	}
}

/// `[nonce]`
struct TransactionCountResponse(u64);

impl<'b, C> Decode<'b, C> for TransactionCountResponse {
	fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> {
		expect_array(d, 1, "transaction count response")?;
		Ok(Self(d.u64()?))
	}
}

/// `[details]`
struct CallResponse(EvmProcessingDetails);

impl<'b, C> Decode<'b, C> for CallResponse {
	fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> Result<Self, decode::Error> {
		expect_array(d, 1, "call response")?;
		Ok(Self(EvmProcessingDetails::decode(d, ctx)?))
	}
}

/// `[gasPrice]`
struct GasPriceResponse(String);

impl<'b, C> Decode<'b, C> for GasPriceResponse {
	fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> {
		expect_array(d, 1, "gas price response")?;
		Ok(Self(d.str()?.to_string()))
	}
}

fn evm_path(endpoint: &str, address: Option<&Address>) -> String {
	match address {
		Some(address) => format!("{EVM_API_PREFIX}/{endpoint}/{}", hex::encode(address.as_slice())),
		None => format!("{EVM_API_PREFIX}/{endpoint}"),
	}
}

#[async_trait]
impl EvmNodeClient for RestClient {
	async fn get_balance(&self, address: &Address) -> Result<EvmBalance, RpcError> {
		let BalanceResponse(balance) = self.get(&evm_path("balance", Some(address))).await?;
		Ok(balance)
	}

	async fn get_transaction_count(&self, address: &Address) -> Result<u64, RpcError> {
		let TransactionCountResponse(nonce) = self
			.get(&evm_path("transactionCount", Some(address)))
			.await?;
		Ok(nonce)
	}

	async fn call(&self, request: &CallEvmRequest) -> Result<EvmProcessingDetails, RpcError> {
		let CallResponse(details) = self
			.post(&evm_path("call", None), request, StatusCode::OK)
			.await?;
		Ok(details)
	}

	async fn get_gas_price(&self) -> Result<String, RpcError> {
		let GasPriceResponse(price) = self.get(&evm_path("gasPrice", None)).await?;
		Ok(price)
	}
}
