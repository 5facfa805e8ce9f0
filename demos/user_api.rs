//! User API demo
//!
//! Run with `cargo run --example user_api --features full`, then:
//!
//! ```text
//! curl localhost:3000/api/users
//! curl localhost:3000/api/users/1
//! curl -X POST localhost:3000/api/users -d '{"name":"Bob","email":"bob@example.com"}'
//! ```

use aqua::aqua_config::ServerConfig;
use aqua::logging::LogConfig;
use aqua::prelude::*;
use aqua::{LoggerMiddleware, LoggingInterceptor, RequestIdMiddleware};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::RwLock;

type UserStore = Arc<RwLock<Vec<Value>>>;

fn user_controller(store: UserStore) -> impl Controller {
    let list = {
        let store = store.clone();
        handler_fn(move |_args: HandlerArgs, _res: ResponseSink| {
            let store = store.clone();
            async move {
                let users = store.read().await.clone();
                Ok(Some(json!({ "users": users })))
            }
        })
    };

    let get = {
        let store = store.clone();
        handler_fn(move |args: HandlerArgs, res: ResponseSink| {
            let store = store.clone();
            async move {
                let id: i64 = args.get(0)?;
                let users = store.read().await;
                match users.iter().find(|u| u["id"] == id) {
                    Some(user) => Ok(Some(json!({ "user": user }))),
                    None => {
                        res.status(404).json(&json!({ "error": "User not found" }))?;
                        Ok(None)
                    }
                }
            }
        })
    };

    let create = handler_fn(move |args: HandlerArgs, res: ResponseSink| {
        let store = store.clone();
        async move {
            let body = args.value(0).cloned().unwrap_or(Value::Null);
            let (Some(name), Some(email)) = (body["name"].as_str(), body["email"].as_str()) else {
                res.status(400)
                    .json(&json!({ "error": "Name and email are required" }))?;
                return Ok(None);
            };

            let mut users = store.write().await;
            let user = json!({ "id": users.len() + 1, "name": name, "email": email });
            users.push(user.clone());
            res.status(201);
            Ok(Some(json!({ "user": user })))
        }
    });

    ControllerBuilder::new("UserController")
        .prefix("/api/users")
        .get("/", "list")
        .get("/:id", "get")
        .post("/", "create")
        .handler("list", list)
        .handler("get", get)
        .handler("create", create)
        .bind("get", ParameterBinding::param(0, "id").with_validator(number()))
        .bind("create", ParameterBinding::body(0))
        .build()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    LogConfig::from_env().init();

    let config = ServerConfig::load(None)?;
    let app = create_app(
        config
            .into_options()
            .middleware(Arc::new(RequestIdMiddleware))
            .middleware(Arc::new(LoggerMiddleware::new())),
    );
    app.use_interceptor(Arc::new(LoggingInterceptor));

    let store: UserStore = Arc::new(RwLock::new(vec![
        json!({ "id": 1, "name": "Alice", "email": "alice@example.com" }),
    ]));
    app.register_controller(&user_controller(store))?;

    println!("Listening on http://{}", app.options().address());
    app.listen_with_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;

    Ok(())
}
