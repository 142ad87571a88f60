//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 基于 mock HTTP 副本的 e2e 测试
//! - 拓扑变更、重试上限、客户端模式校验

#[cfg(test)]
mod contract_tests {
    use contracts::{LOGS_HEADER, LOG_LEVEL_HEADER};

    #[test]
    fn test_wire_headers() {
        assert_eq!(LOG_LEVEL_HEADER, "x-nuclio-log-level");
        assert_eq!(LOGS_HEADER, "X-Nuclio-Logs");
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::{HashMap, HashSet};
    use std::time::Duration;

    use contracts::{
        ClientConfig, InvokeError, InvokerConfig, RouterConfig, Task, TaskResponse, Topology,
        LOGS_HEADER, LOG_LEVEL_HEADER,
    };
    use dispatcher::{create_router, DispatcherError, FunctionClient, Router};
    use invoker::HttpConnector;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    /// Replies with the request body
    struct Echo;

    impl Respond for Echo {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            ResponseTemplate::new(200).set_body_bytes(request.body.clone())
        }
    }

    async fn echo_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(Echo)
            .mount(&server)
            .await;
        server
    }

    fn fast_invoker() -> InvokerConfig {
        InvokerConfig {
            retry_min_backoff_ms: 1,
            ..Default::default()
        }
    }

    fn http_router(workers: usize) -> Router {
        let config = RouterConfig {
            workers,
            ..Default::default()
        };
        Router::new("f1", config, HttpConnector::new(&fast_invoker()).unwrap())
    }

    fn topology(servers: &[(&str, &MockServer)]) -> Topology {
        servers
            .iter()
            .map(|(name, server)| (name.to_string(), server.address().to_string()))
            .collect()
    }

    async fn collect(router: &Router, n: usize) -> Vec<TaskResponse> {
        let rx = router.responses();
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            let resp = tokio::time::timeout(Duration::from_secs(10), rx.recv())
                .await
                .expect("timed out waiting for responses")
                .expect("response queue closed");
            out.push(resp);
        }
        out
    }

    async fn request_count(server: &MockServer) -> usize {
        server.received_requests().await.map(|r| r.len()).unwrap_or(0)
    }

    /// 15 个任务，1 个副本，2 个 worker：每个任务恰好一个响应
    #[tokio::test]
    async fn test_e2e_single_replica_two_workers() {
        let server = echo_server().await;
        let router = http_router(2);
        router.update_endpoints(&topology(&[("func1", &server)])).await;

        let tasks: Vec<Task> = (0..15).map(|i| Task::new(i, format!("task-{i}"))).collect();
        assert_eq!(router.submit(tasks).await.unwrap(), 15);

        let responses = collect(&router, 15).await;
        let mut sequences = HashSet::new();
        for resp in &responses {
            assert!(resp.is_ok(), "unexpected error: {:?}", resp.error);
            assert_eq!(resp.status_code, 200);
            assert_eq!(resp.status, "200 OK");
            assert_eq!(resp.task.retries, 0);
            assert!(resp.worker < 2);
            assert_eq!(
                resp.body.as_ref(),
                format!("task-{}", resp.sequence()).as_bytes()
            );
            assert!(sequences.insert(resp.sequence()), "duplicate response");
        }
        assert_eq!(sequences, (0..15).collect());
        assert_eq!(request_count(&server).await, 15);

        router.shutdown().await;
    }

    /// 多副本共享队列：无丢失、无重复
    #[tokio::test]
    async fn test_e2e_no_loss_across_replicas() {
        let a = echo_server().await;
        let b = echo_server().await;
        let c = echo_server().await;
        let router = http_router(2);
        router
            .update_endpoints(&topology(&[("a", &a), ("b", &b), ("c", &c)]))
            .await;

        router
            .submit((0..90).map(|i| Task::new(i, i.to_string())))
            .await
            .unwrap();

        let responses = collect(&router, 90).await;
        let sequences: HashSet<i64> = responses.iter().map(|r| r.sequence()).collect();
        assert_eq!(sequences.len(), 90);

        let mut per_address: HashMap<&str, usize> = HashMap::new();
        for resp in &responses {
            *per_address.entry(resp.address.as_str()).or_default() += 1;
        }
        assert_eq!(per_address.values().sum::<usize>(), 90);

        let served = request_count(&a).await + request_count(&b).await + request_count(&c).await;
        assert_eq!(served, 90);

        router.shutdown().await;
    }

    /// 相同快照重复应用不产生变化
    #[tokio::test]
    async fn test_e2e_idempotent_topology() {
        let a = echo_server().await;
        let b = echo_server().await;
        let router = http_router(1);
        let snapshot = topology(&[("a", &a), ("b", &b)]);

        let first = router.update_endpoints(&snapshot).await;
        assert_eq!(first.added.len(), 2);
        let second = router.update_endpoints(&snapshot).await;
        assert!(second.is_empty());
        assert_eq!(router.replica_names().await, vec!["a", "b"]);

        router.shutdown().await;
    }

    /// 移除副本后不再有请求到达该副本
    #[tokio::test]
    async fn test_e2e_replica_removal() {
        let a = echo_server().await;
        let b = echo_server().await;
        let router = http_router(2);
        router
            .update_endpoints(&topology(&[("a", &a), ("b", &b)]))
            .await;

        router
            .submit((0..10).map(|i| Task::new(i, "x")))
            .await
            .unwrap();
        collect(&router, 10).await;

        let change = router.update_endpoints(&topology(&[("b", &b)])).await;
        assert_eq!(change.removed, vec!["a"]);
        let served_by_a = request_count(&a).await;

        router
            .submit((10..30).map(|i| Task::new(i, "y")))
            .await
            .unwrap();
        let responses = collect(&router, 20).await;
        let b_address = b.address().to_string();
        assert!(responses.iter().all(|r| r.address == b_address));
        assert_eq!(request_count(&a).await, served_by_a);

        assert!(router.del_instance("b").await);
        assert_eq!(router.replica_count().await, 0);
        router.shutdown().await;
    }

    /// 默认重试上限：共 6 次尝试
    #[tokio::test]
    async fn test_e2e_retry_bound() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(503))
            .expect(6)
            .mount(&server)
            .await;

        let router = http_router(1);
        router
            .update_endpoints(&topology(&[("flaky", &server)]))
            .await;
        router.submit([Task::new(42, "x")]).await.unwrap();

        let resp = collect(&router, 1).await.remove(0);
        assert_eq!(resp.sequence(), 42);
        assert_eq!(resp.task.retries, 1);
        assert_eq!(
            resp.error,
            Some(InvokeError::ServerStatus {
                address: server.address().to_string(),
                attempts: 6,
                status: 503,
            })
        );

        server.verify().await;

        // The worker keeps serving after a failure
        server.reset().await;
        Mock::given(method("PUT"))
            .respond_with(Echo)
            .mount(&server)
            .await;
        router.submit([Task::new(43, "again")]).await.unwrap();
        let resp = collect(&router, 1).await.remove(0);
        assert!(resp.is_ok());
        assert_eq!(resp.body.as_ref(), b"again");

        router.shutdown().await;
    }

    /// 客户端模式保护
    #[tokio::test]
    async fn test_client_mode_guard() {
        let server = echo_server().await;

        let sync = FunctionClient::new(&ClientConfig {
            address: server.address().to_string(),
            workers: 0,
            invoker: fast_invoker(),
        })
        .unwrap();
        assert!(matches!(
            sync.submit_async(Task::new(0, "x")).await,
            Err(DispatcherError::Configuration { .. })
        ));
        let resp = sync.submit(Task::new(0, "hello")).await.unwrap();
        assert_eq!(resp.body.as_ref(), b"hello");

        let async_client = FunctionClient::new(&ClientConfig {
            address: server.address().to_string(),
            workers: 1,
            invoker: fast_invoker(),
        })
        .unwrap();
        assert!(matches!(
            async_client.submit(Task::new(0, "x")).await,
            Err(DispatcherError::Configuration { .. })
        ));
        async_client.close().await;
    }

    /// 异步客户端往返
    #[tokio::test]
    async fn test_async_client_round_trip() {
        let server = echo_server().await;
        let client = FunctionClient::new(&ClientConfig {
            address: server.uri(),
            workers: 3,
            invoker: fast_invoker(),
        })
        .unwrap();

        for i in 0..6 {
            client.submit_async(Task::new(i, format!("m{i}"))).await.unwrap();
        }

        let rx = client.responses().unwrap();
        let mut seen = HashSet::new();
        for _ in 0..6 {
            let resp = tokio::time::timeout(Duration::from_secs(10), rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(resp.address, server.uri());
            assert_eq!(resp.body.as_ref(), format!("m{}", resp.sequence()).as_bytes());
            seen.insert(resp.sequence());
        }
        assert_eq!(seen.len(), 6);

        client.close().await;
    }

    /// 日志 header 解析与格式化
    #[tokio::test]
    async fn test_log_header_formatting() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header(LOG_LEVEL_HEADER, "debug"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok").insert_header(
                LOGS_HEADER,
                r#"[{"level":"info","time":1000000.0,"name":"svc","message":"hi","x":1}]"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = FunctionClient::new(&ClientConfig {
            address: server.address().to_string(),
            workers: 0,
            invoker: InvokerConfig {
                method: "POST".to_string(),
                log_level: Some(contracts::LogLevel::Debug),
                ..fast_invoker()
            },
        })
        .unwrap();

        let resp = client.submit(Task::new(0, "")).await.unwrap();
        let lines = invoker::response_log_lines(&resp).unwrap();
        assert_eq!(
            lines,
            vec!["1970-01-01 00:16:40.000 UTC  [info]  svc   hi, x: 1".to_string()]
        );
    }

    /// 从配置创建路由器
    #[tokio::test]
    async fn test_create_router_from_config() {
        let server = echo_server().await;
        let content = format!(
            r#"
[function]
name = "echo"

[invoker]
retry_min_backoff_ms = 1

[router]
workers = 2

[[replicas]]
name = "echo-1"
address = "{}"
"#,
            server.address()
        );
        let config = config_loader::ConfigLoader::load_from_str(
            &content,
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();

        let router = create_router(&config).await.unwrap();
        assert_eq!(router.replica_names().await, vec!["echo-1"]);

        router
            .submit((0..4).map(|i| Task::new(i, "cfg")))
            .await
            .unwrap();
        let responses = collect(&router, 4).await;
        assert!(responses.iter().all(|r| r.is_ok()));

        let metrics = router.metrics().await;
        assert_eq!(metrics[0].1.success_count, 4);

        router.shutdown().await;
    }
}
