pub mod mock_feed;
pub mod mock_rest;
