//! REST client for the partition independent node API.

use crate::{Empty, NodeClient, ResponseShape, RpcError, API_PATH_PREFIX};
use async_trait::async_trait;
use minicbor::{decode, Decode, Decoder, Encode};
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;
use wallet_types::codec::{self, expect_array};
use wallet_types::{RoundInfo, TransactionOrder, TxHash, TxRecordProof};

/// Default request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("ledger-wallet/", env!("CARGO_PKG_VERSION"));

/// HTTP client of a single node.
///
/// Cloning is cheap and clones share the connection pool.
#[derive(Debug, Clone)]
pub struct RestClient {
	base: Url,
	http: Client,
}

impl RestClient {
	/// Creates a client for the node at `rpc_url`. Only the scheme, host and
	/// port of the URL are used.
	pub fn new(rpc_url: &str, timeout: Duration) -> Result<Self, RpcError> {
		let base = Url::parse(rpc_url)
			.map_err(|e| RpcError::Configuration(format!("rpc url {rpc_url:?}: {e}")))?;
		if base.cannot_be_a_base() {
			return Err(RpcError::Configuration(format!(
				"rpc url {rpc_url:?} has no host"
			)));
		}
		let http = Client::builder()
			.user_agent(USER_AGENT)
			.timeout(timeout)
			.build()
			.map_err(|e| RpcError::Configuration(e.to_string()))?;
		Ok(Self { base, http })
	}

	/// Absolute URL of an API path such as `rounds/latest`.
	pub fn url(&self, path: &str) -> Url {
		let mut url = self.base.clone();
		url.set_path(&format!(
			"{}/{}",
			API_PATH_PREFIX,
			path.trim_start_matches('/')
		));
		url
	}

	/// Sends a GET request and decodes a 200 response into `T`.
	pub async fn get<T: ResponseShape>(&self, path: &str) -> Result<T, RpcError> {
		let url = self.url(path);
		tracing::trace!(%url, "GET");
		let response = self
			.http
			.get(url)
			.send()
			.await
			.map_err(transport_error)?;
		decode_response(response, StatusCode::OK).await
	}

	/// Sends a POST request with a CBOR body and decodes the response into `T`
	/// when the node answers with `expected_status`.
	pub async fn post<B, T>(
		&self,
		path: &str,
		body: &B,
		expected_status: StatusCode,
	) -> Result<T, RpcError>
	where
		B: Encode<()>,
		T: ResponseShape,
	{
		let body = codec::encode_to_vec(body)?;
		let url = self.url(path);
		tracing::trace!(%url, bytes = body.len(), "POST");
		let response = self
			.http
			.post(url)
			.header(reqwest::header::CONTENT_TYPE, "application/cbor")
			.body(body)
			.send()
			.await
			.map_err(transport_error)?;
		decode_response(response, expected_status).await
	}
}

#[async_trait]
impl NodeClient for RestClient {
	async fn post_transaction(&self, order: &TransactionOrder) -> Result<(), RpcError> {
		self.post::<_, Empty>("transactions", order, StatusCode::ACCEPTED)
			.await
			.map(|_| ())
	}

	async fn get_round_info(&self) -> Result<RoundInfo, RpcError> {
		let round: u64 = self.get("rounds/latest").await?;
		Ok(RoundInfo::indexed(round))
	}

	async fn get_tx_proof(&self, tx_hash: &TxHash) -> Result<Option<TxRecordProof>, RpcError> {
		match self
			.get::<TxRecordProof>(&format!("transactions/{}", tx_hash.to_hex()))
			.await
		{
			Ok(proof) => Ok(Some(proof)),
			Err(RpcError::NotFound) => Ok(None),
			Err(e) => Err(e),
		}
	}
}

fn transport_error(err: reqwest::Error) -> RpcError {
	RpcError::Protocol {
		status: err.status().map(|s| s.as_u16()),
		message: format!("request to rpc node failed: {err}"),
	}
}

/// `[errorString]` body of a failed request.
struct ErrorInfo(String);

impl<'b, C> Decode<'b, C> for ErrorInfo {
	fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> {
		expect_array(d, 1, "error response")?;
		Ok(Self(d.str()?.to_string()))
	}
}

async fn decode_response<T: ResponseShape>(
	response: reqwest::Response,
	expected_status: StatusCode,
) -> Result<T, RpcError> {
	let status = response.status();
	if status == StatusCode::NOT_FOUND {
		return Err(RpcError::NotFound);
	}
	let body = response.bytes().await.map_err(transport_error)?;
	if status == expected_status {
		return T::from_body(&body).map_err(|e| RpcError::Protocol {
			status: Some(status.as_u16()),
			message: format!("failed to decode response body: {e}"),
		});
	}
	let message = match codec::decode_from_slice::<ErrorInfo>(&body) {
		Ok(ErrorInfo(err)) => format!("{status}, {err}"),
		Err(_) => status.to_string(),
	};
	Err(RpcError::Protocol {
		status: Some(status.as_u16()),
		message,
	})
}
