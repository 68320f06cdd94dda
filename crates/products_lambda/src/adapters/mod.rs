pub mod dynamo_store;
