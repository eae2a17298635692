use crate::integration::mocks::{
	create_evm_test_network_with_urls, create_evm_valid_server_mock_network_response,
};
use ethereum_tx_monitor::{
	models::EVMBlockTransactions,
	services::blockchain::{BlockChainClient, BlockChainError, EvmClient},
	utils::tests::builders::evm::{block::BlockBuilder, transaction::TransactionBuilder},
};
use alloy::primitives::{Address, B256, U256};
use mockito::{Matcher, Server};
use serde_json::json;

fn rpc_result(result: serde_json::Value) -> String {
	json!({"jsonrpc": "2.0", "id": 1, "result": result}).to_string()
}

#[tokio::test]
async fn test_get_latest_block_number() {
	let mut server = Server::new_async().await;
	let _network_mock = create_evm_valid_server_mock_network_response(&mut server).await;
	let block_mock = server
		.mock("POST", "/")
		.match_body(Matcher::PartialJson(json!({"method": "eth_blockNumber"})))
		.with_header("content-type", "application/json")
		.with_body(rpc_result(json!("0x12d687")))
		.create_async()
		.await;

	let network = create_evm_test_network_with_urls(vec![server.url().as_str()]);
	let client = EvmClient::new(&network).await.unwrap();

	assert_eq!(client.get_latest_block_number().await.unwrap(), 1_234_567);
	block_mock.assert();
}

#[tokio::test]
async fn test_get_block_with_full_transactions() {
	let mut server = Server::new_async().await;
	let _network_mock = create_evm_valid_server_mock_network_response(&mut server).await;

	let transaction = TransactionBuilder::new()
		.hash(B256::repeat_byte(0x01))
		.from(Address::repeat_byte(0xaa))
		.to(Address::repeat_byte(0xbb))
		.value(U256::from(10u64).pow(U256::from(20u64)))
		.build();
	let block = BlockBuilder::new()
		.number(100)
		.transactions(vec![transaction.clone()])
		.build();

	let block_mock = server
		.mock("POST", "/")
		.match_body(Matcher::PartialJson(json!({
			"method": "eth_getBlockByNumber",
			"params": ["0x64", true]
		})))
		.with_header("content-type", "application/json")
		.with_body(rpc_result(serde_json::to_value(&block).unwrap()))
		.create_async()
		.await;

	let network = create_evm_test_network_with_urls(vec![server.url().as_str()]);
	let client = EvmClient::new(&network).await.unwrap();

	let fetched = client.get_block(100, true).await.unwrap().unwrap();
	assert_eq!(fetched.number(), Some(100));
	match fetched.transactions() {
		EVMBlockTransactions::Full(transactions) => {
			assert_eq!(transactions.len(), 1);
			assert_eq!(transactions[0].hash(), transaction.hash());
			assert_eq!(transactions[0].value(), transaction.value());
		}
		other => panic!("Expected full transactions, got {:?}", other),
	}
	block_mock.assert();
}

#[tokio::test]
async fn test_get_block_with_transaction_hashes() {
	let mut server = Server::new_async().await;
	let _network_mock = create_evm_valid_server_mock_network_response(&mut server).await;
	let hashes = vec![B256::repeat_byte(0x01), B256::repeat_byte(0x02)];
	let block = BlockBuilder::new()
		.number(7)
		.transaction_hashes(hashes.clone())
		.build();

	let _block_mock = server
		.mock("POST", "/")
		.match_body(Matcher::PartialJson(json!({"method": "eth_getBlockByNumber"})))
		.with_header("content-type", "application/json")
		.with_body(rpc_result(serde_json::to_value(&block).unwrap()))
		.create_async()
		.await;

	let network = create_evm_test_network_with_urls(vec![server.url().as_str()]);
	let client = EvmClient::new(&network).await.unwrap();

	let fetched = client.get_block(7, false).await.unwrap().unwrap();
	assert_eq!(fetched.transactions(), &EVMBlockTransactions::Hashes(hashes));
}

#[tokio::test]
async fn test_missing_block_is_none() {
	let mut server = Server::new_async().await;
	let _network_mock = create_evm_valid_server_mock_network_response(&mut server).await;
	let _block_mock = server
		.mock("POST", "/")
		.match_body(Matcher::PartialJson(json!({"method": "eth_getBlockByNumber"})))
		.with_header("content-type", "application/json")
		.with_body(rpc_result(serde_json::Value::Null))
		.create_async()
		.await;

	let network = create_evm_test_network_with_urls(vec![server.url().as_str()]);
	let client = EvmClient::new(&network).await.unwrap();

	assert!(client.get_block(999_999_999, true).await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_transaction_receipt() {
	let mut server = Server::new_async().await;
	let _network_mock = create_evm_valid_server_mock_network_response(&mut server).await;
	let hash = format!("0x{}", "ab".repeat(32));
	let receipt_mock = server
		.mock("POST", "/")
		.match_body(Matcher::PartialJson(json!({
			"method": "eth_getTransactionReceipt",
			"params": [hash]
		})))
		.with_header("content-type", "application/json")
		.with_body(rpc_result(json!({
			"transactionHash": hash,
			"blockNumber": "0x64",
			"gasUsed": "0x5208",
			"status": "0x1",
			"contractAddress": null
		})))
		.create_async()
		.await;

	let network = create_evm_test_network_with_urls(vec![server.url().as_str()]);
	let client = EvmClient::new(&network).await.unwrap();

	let receipt = client
		.get_transaction_receipt(&hash.to_uppercase().replacen("0X", "0x", 1))
		.await
		.unwrap()
		.unwrap();
	assert_eq!(receipt.succeeded(), Some(true));
	assert_eq!(receipt.gas_used(), Some(&U256::from(21_000u64)));
	assert!(receipt.contract_address().is_none());
	receipt_mock.assert();
}

#[tokio::test]
async fn test_rpc_error_is_request_error() {
	let mut server = Server::new_async().await;
	let _network_mock = create_evm_valid_server_mock_network_response(&mut server).await;
	let _error_mock = server
		.mock("POST", "/")
		.match_body(Matcher::PartialJson(json!({"method": "eth_getTransactionByHash"})))
		.with_header("content-type", "application/json")
		.with_body(
			json!({
				"jsonrpc": "2.0",
				"id": 1,
				"error": {"code": -32000, "message": "transaction indexing is in progress"}
			})
			.to_string(),
		)
		.create_async()
		.await;

	let network = create_evm_test_network_with_urls(vec![server.url().as_str()]);
	let client = EvmClient::new(&network).await.unwrap();

	let result = client
		.get_transaction(&format!("0x{}", "01".repeat(32)))
		.await;
	match result {
		Err(BlockChainError::RequestError(ctx)) => {
			assert_eq!(ctx.message, "transaction indexing is in progress");
		}
		other => panic!("Expected request error, got {:?}", other),
	}
}

#[tokio::test]
async fn test_invalid_hash_is_rejected_before_request() {
	let mut server = Server::new_async().await;
	let _network_mock = create_evm_valid_server_mock_network_response(&mut server).await;
	let never_called = server
		.mock("POST", "/")
		.match_body(Matcher::PartialJson(json!({"method": "eth_getTransactionByHash"})))
		.expect(0)
		.create_async()
		.await;

	let network = create_evm_test_network_with_urls(vec![server.url().as_str()]);
	let client = EvmClient::new(&network).await.unwrap();

	let result = client.get_transaction("0x1234").await;
	assert!(matches!(result, Err(BlockChainError::TransactionError(_))));
	never_called.assert();
}

#[tokio::test]
async fn test_new_client_fails_when_no_endpoint_answers() {
	let mut server = Server::new_async().await;
	let _unavailable = server
		.mock("POST", "/")
		.with_status(404)
		.create_async()
		.await;

	let network = create_evm_test_network_with_urls(vec![server.url().as_str()]);
	assert!(EvmClient::new(&network).await.is_err());
}
