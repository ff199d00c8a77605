#![allow(dead_code)]

pub mod events {
    use parking_lot::Mutex;

    /// Shared, container-provided record of what ran and in which order.
    #[derive(Debug, Default)]
    pub struct EventLog {
        entries: Mutex<Vec<String>>,
    }

    impl EventLog {
        pub fn push(&self, entry: impl Into<String>) {
            self.entries.lock().push(entry.into());
        }

        pub fn entries(&self) -> Vec<String> {
            self.entries.lock().clone()
        }

        pub fn clear(&self) {
            self.entries.lock().clear();
        }
    }
}

pub mod middleware {
    use std::sync::Arc;

    use hyperdrive::{
        Arguments, ContainerError, Dependency, DispatchError, Injectable, Middleware,
        RequestContext, RequestHandler, Response,
    };

    use super::events::EventLog;

    macro_rules! recording_middleware {
        ($name:ident, $label:literal) => {
            /// Records `<label>:before` and `<label>:after` around the rest of the chain.
            pub struct $name {
                log: Arc<EventLog>,
            }

            impl Injectable for $name {
                fn dependencies() -> Vec<Dependency> {
                    vec![Dependency::service::<EventLog>("log")]
                }

                fn construct(args: &mut Arguments) -> Result<Self, ContainerError> {
                    Ok(Self { log: args.next()? })
                }
            }

            impl Middleware for $name {
                fn process(
                    &self,
                    request: RequestContext,
                    next: &mut dyn RequestHandler,
                ) -> Result<Response, DispatchError> {
                    self.log.push(concat!($label, ":before"));
                    let response = next.handle(request);
                    self.log.push(concat!($label, ":after"));
                    response
                }
            }
        };
    }

    recording_middleware!(GlobalOne, "G1");
    recording_middleware!(GlobalTwo, "G2");
    recording_middleware!(RouteOne, "R1");

    /// Sets the `user_id` attribute for `Authorization: Bearer valid`, answers 401 otherwise.
    pub struct BearerAuth;

    impl Injectable for BearerAuth {
        fn construct(_: &mut Arguments) -> Result<Self, ContainerError> {
            Ok(BearerAuth)
        }
    }

    impl Middleware for BearerAuth {
        fn process(
            &self,
            request: RequestContext,
            next: &mut dyn RequestHandler,
        ) -> Result<Response, DispatchError> {
            match request.header("Authorization") {
                Some("Bearer valid") => next.handle(request.with_attribute("user_id", 42)),
                _ => Ok(Response::error(401, "Unauthorized")),
            }
        }
    }

    /// A middleware the container can never build (its dependency is not registered).
    pub struct Unbuildable;

    pub struct NeverRegistered;

    impl Injectable for Unbuildable {
        fn dependencies() -> Vec<Dependency> {
            vec![Dependency::service::<NeverRegistered>("missing")]
        }

        fn construct(_: &mut Arguments) -> Result<Self, ContainerError> {
            Ok(Unbuildable)
        }
    }

    impl Middleware for Unbuildable {
        fn process(
            &self,
            _request: RequestContext,
            _next: &mut dyn RequestHandler,
        ) -> Result<Response, DispatchError> {
            Ok(Response::error(418, "should never run"))
        }
    }
}

pub mod users {
    use std::collections::HashMap;
    use std::sync::Arc;

    use hyperdrive::validation::{IsArray, IsEmail, IsInt, ItemType, MinValue, NotEmpty};
    use hyperdrive::{
        Arguments, ContainerError, Controller, ControllerRoutes, Dependency, DispatchError, Dto,
        FieldRules, HandlerResult, Injectable, Response, ValidationErrors,
    };
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use super::events::EventLog;
    use super::middleware::{BearerAuth, RouteOne, Unbuildable};

    #[derive(Debug, Clone, Serialize)]
    pub struct User {
        pub id: i64,
        pub name: String,
    }

    pub struct UserRepository {
        users: HashMap<i64, User>,
    }

    impl Injectable for UserRepository {
        fn construct(_: &mut Arguments) -> Result<Self, ContainerError> {
            let users = [(42, "Ada"), (7, "Grace")]
                .into_iter()
                .map(|(id, name)| {
                    (
                        id,
                        User {
                            id,
                            name: name.to_string(),
                        },
                    )
                })
                .collect();
            Ok(Self { users })
        }
    }

    impl UserRepository {
        pub fn find(&self, id: i64) -> Option<&User> {
            self.users.get(&id)
        }
    }

    pub trait Mailer: Send + Sync {
        fn send(&self, to: &str) -> String;
    }

    pub struct SmtpMailer;

    impl Injectable for SmtpMailer {
        fn construct(_: &mut Arguments) -> Result<Self, ContainerError> {
            Ok(SmtpMailer)
        }
    }

    impl Mailer for SmtpMailer {
        fn send(&self, to: &str) -> String {
            format!("mail sent to {to}")
        }
    }

    pub fn smtp_mailer(mailer: Arc<SmtpMailer>) -> Arc<dyn Mailer> {
        mailer
    }

    #[derive(Debug, Deserialize)]
    pub struct CreateUserDto {
        pub name: String,
        pub email: String,
        pub age: i64,
        pub roles: Vec<String>,
    }

    impl Dto for CreateUserDto {
        fn rules() -> FieldRules {
            FieldRules::new()
                .field("name", NotEmpty)
                .field("email", NotEmpty)
                .field("email", IsEmail)
                .field("age", IsInt)
                .field("age", MinValue(18))
                .field(
                    "roles",
                    IsArray::of(ItemType::String).with_values_in(vec![json!("admin"), json!("user")]),
                )
        }

        fn validate(&self, errors: &mut ValidationErrors) {
            if self.name.eq_ignore_ascii_case("root") {
                errors.add("name", "Is reserved");
            }
        }
    }

    pub struct UserController {
        repository: Arc<UserRepository>,
        log: Arc<EventLog>,
    }

    impl Injectable for UserController {
        fn dependencies() -> Vec<Dependency> {
            vec![
                Dependency::service::<UserRepository>("repository"),
                Dependency::service::<EventLog>("log"),
            ]
        }

        fn construct(args: &mut Arguments) -> Result<Self, ContainerError> {
            Ok(Self {
                repository: args.next()?,
                log: args.next()?,
            })
        }
    }

    impl UserController {
        fn show(&self, id: i64) -> Result<HandlerResult, DispatchError> {
            self.log.push("handler");
            let user = self
                .repository
                .find(id)
                .ok_or_else(|| DispatchError::http(404, "User not found"))?;
            HandlerResult::json(user)
        }

        fn create(&self, dto: CreateUserDto) -> Result<HandlerResult, DispatchError> {
            self.log.push("create");
            let body = json!({ "name": dto.name, "email": dto.email, "roles": dto.roles });
            Ok(Response::created(&body).into())
        }
    }

    impl Controller for UserController {
        fn routes(r: &mut ControllerRoutes<Self>) {
            r.prefix("/users");
            r.get("/{id}", "show")
                .int("id")
                .middleware::<RouteOne>()
                .to(|c, args| c.show(args.int("id")?));
            r.get("/me", "me")
                .middleware::<BearerAuth>()
                .int("user_id")
                .to(|_, args| Ok(json!({ "id": args.int("user_id")? }).into()));
            r.post("/", "create")
                .dto::<CreateUserDto>("body")
                .to(|c, args| c.create(args.dto("body")?));
            r.get("/{id}/notify", "notify")
                .int("id")
                .service::<dyn Mailer>("mailer")
                .to(|_, args| {
                    let mailer = args.interface::<dyn Mailer>("mailer")?;
                    Ok(mailer.send(&format!("user-{}", args.int("id")?)).into())
                });
            r.get("/{id}/degraded", "degraded")
                .int("id")
                .middleware::<Unbuildable>()
                .to(|_, args| Ok(format!("degraded {}", args.int("id")?).into()));
            r.get("/boom", "boom")
                .to(|_, _| Err(DispatchError::handler("kaboom")));
            r.get("/loose", "loose")
                .untyped("thing")
                .to(|_, _| Ok("unreachable".into()));
        }
    }
}

pub mod presence {
    use std::sync::Arc;

    use hyperdrive::gateway::{Gateway, GatewayHandlers};
    use hyperdrive::{Arguments, ContainerError, Dependency, DispatchError, Injectable};
    use serde_json::json;

    use super::events::EventLog;
    use super::users::UserRepository;

    /// Answers `whois` lookups over a socket mounted at `/ws/presence`.
    pub struct PresenceGateway {
        repository: Arc<UserRepository>,
        log: Arc<EventLog>,
    }

    impl Injectable for PresenceGateway {
        fn dependencies() -> Vec<Dependency> {
            vec![
                Dependency::service::<UserRepository>("repository"),
                Dependency::service::<EventLog>("log"),
            ]
        }

        fn construct(args: &mut Arguments) -> Result<Self, ContainerError> {
            Ok(Self {
                repository: args.next()?,
                log: args.next()?,
            })
        }
    }

    impl Gateway for PresenceGateway {
        fn handlers(h: &mut GatewayHandlers<Self>) {
            h.path("/presence");
            h.on_connection("join", |g, conn| {
                g.log.push(format!("join {}", conn.id()));
                Ok(())
            });
            h.on_message_type("whois", "whois", |g, msg| {
                let id = msg.data()["id"].as_i64().unwrap_or_default();
                let user = g
                    .repository
                    .find(id)
                    .ok_or_else(|| DispatchError::http(404, "User not found"))?;
                msg.connection()
                    .send(json!({ "type": "user", "name": user.name }));
                Ok(())
            });
            h.on_message("unsupported", |_, msg| {
                msg.connection()
                    .send(json!({ "type": "error", "message": "unsupported" }));
                Ok(())
            });
            h.on_disconnection("leave", |g, conn| {
                g.log.push(format!("leave {}", conn.id()));
                Ok(())
            });
        }
    }
}

pub mod app {
    use hyperdrive::{AppConfig, Application, Environment, Module};

    use super::events::EventLog;
    use super::middleware::{BearerAuth, GlobalOne, GlobalTwo, RouteOne, Unbuildable};
    use super::presence::PresenceGateway;
    use super::users::{smtp_mailer, Mailer, SmtpMailer, UserController, UserRepository};

    pub fn users_module() -> Module {
        Module::new("users")
            .controller::<UserController>()
            .gateway::<PresenceGateway>()
            .injectable::<UserRepository>()
            .bind_interface::<dyn Mailer, SmtpMailer, _>(smtp_mailer)
            .middleware::<RouteOne>()
            .middleware::<Unbuildable>()
            .middleware_alias::<BearerAuth>("auth")
    }

    pub fn root_module() -> Module {
        Module::new("root").prefix("/api").import(users_module())
    }

    /// Booted application with `G1` then `G2` as global middleware.
    pub fn build_app(environment: Environment) -> Application {
        let mut app = Application::new(AppConfig::for_environment(environment));
        app.container_mut().register_instance(EventLog::default());
        app.register_module(&root_module()).unwrap();
        app.use_global::<GlobalOne>().use_global::<GlobalTwo>();
        app.boot().unwrap();
        app
    }

    pub fn event_log(app: &Application) -> std::sync::Arc<EventLog> {
        app.container().resolve::<EventLog>().unwrap()
    }
}
