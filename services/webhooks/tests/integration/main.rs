
mod http_test;
mod queue_test;
