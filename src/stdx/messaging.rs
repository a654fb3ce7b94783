//=============================================
// nekoscript/stdx/messaging.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Messaging bot capability module
// Objective: Build chat bots over a pluggable gateway (Discord REST API or
//            an offline simulator) with message, ready and slash-command
//            handlers plus embed/button/menu builders
//=============================================

use super::{ModuleBuilder, map_of};
use crate::interpreter::{
    Bindings, HostTask, Interpreter, NativeArity, RuntimeError, TaskStatus, Value, arg,
    expect_callable, expect_list, expect_map, expect_number, expect_text, value_to_json,
};
use serde_json::{Value as JsonValue, json};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;
use std::time::{Duration, Instant};

pub const INTENT_GUILDS: u64 = 1 << 0;
pub const INTENT_GUILD_MESSAGES: u64 = 1 << 9;
pub const INTENT_MESSAGE_CONTENT: u64 = 1 << 15;
pub const DEFAULT_INTENTS: u64 = INTENT_GUILDS | INTENT_GUILD_MESSAGES | INTENT_MESSAGE_CONTENT;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

pub fn create_module(interpreter: &mut Interpreter) -> Result<Bindings, RuntimeError> {
    let api_base = interpreter.config().messaging.api_base.clone();
    let poll_interval = Duration::from_millis(interpreter.config().messaging.poll_interval_ms);

    let mut builder = ModuleBuilder::new("Messaging");
    builder
        .function("creerBot", NativeArity::between(1, 2), move |_, args| {
            let token = match arg(args, 0) {
                Value::Null => String::new(),
                value => value.to_string(),
            };
            let options = match args.get(1) {
                Some(Value::Null) | None => Bindings::new(),
                Some(value) => expect_map(value, "creerBot")?,
            };
            let settings = BotSettings::from_options(&options, poll_interval)?;
            let gateway: Box<dyn Gateway> = if looks_like_token(&token) {
                Box::new(RestGateway::new(&api_base, &token, settings.channels.clone(), poll_interval))
            } else {
                tracing::warn!("bot token missing or malformed, using offline gateway");
                Box::new(OfflineGateway::default())
            };
            Ok(bot_value(Rc::new(RefCell::new(BotState::new(settings, gateway)))))
        })
        .constant("INTENTIONS_PAR_DEFAUT", Value::Number(DEFAULT_INTENTS as f64))
        .function("creerEmbed", NativeArity::between(1, 3), |_, args| {
            Ok(map_of([
                ("type", Value::text("embed")),
                ("titre", Value::text(expect_text(&arg(args, 0), "creerEmbed")?)),
                ("description", Value::text(arg(args, 1).to_string())),
                ("couleur", args.get(2).cloned().unwrap_or(Value::Number(0x5865F2 as f64))),
                ("champs", Value::List(Vec::new())),
            ]))
        })
        .function("ajouterChamp", NativeArity::between(3, 4), |_, args| {
            let mut embed = expect_map(&arg(args, 0), "ajouterChamp")?;
            let mut fields = match embed.get("champs") {
                Some(value) => expect_list(value, "ajouterChamp")?,
                None => Vec::new(),
            };
            fields.push(map_of([
                ("nom", Value::text(arg(args, 1).to_string())),
                ("valeur", Value::text(arg(args, 2).to_string())),
                ("enLigne", Value::Bool(arg(args, 3).is_truthy())),
            ]));
            embed.insert("champs".into(), Value::List(fields));
            Ok(Value::Map(embed))
        })
        .function("creerBouton", NativeArity::between(2, 3), |_, args| {
            Ok(map_of([
                ("type", Value::text("bouton")),
                ("libelle", Value::text(arg(args, 0).to_string())),
                ("id", Value::text(arg(args, 1).to_string())),
                ("style", args.get(2).cloned().unwrap_or(Value::text("primaire"))),
            ]))
        })
        .function("creerMenu", NativeArity::Exact(2), |_, args| {
            Ok(map_of([
                ("type", Value::text("menu")),
                ("id", Value::text(arg(args, 0).to_string())),
                ("options", Value::List(expect_list(&arg(args, 1), "creerMenu")?)),
            ]))
        });
    Ok(builder.build())
}

/// Bot tokens are three dot-separated segments.
fn looks_like_token(token: &str) -> bool {
    let parts: Vec<&str> = token.split('.').collect();
    parts.len() == 3 && parts.iter().all(|part| !part.is_empty())
}

//=============================================
//            Section 1: Gateways
//=============================================

#[derive(Debug, Clone, PartialEq)]
pub struct IncomingMessage {
    pub id: String,
    pub channel_id: String,
    pub author: String,
    pub content: String,
}

/// Transport between a bot and its chat service.
pub trait Gateway {
    fn name(&self) -> &str;
    fn is_online(&self) -> bool;
    fn connect(&mut self) -> Result<(), RuntimeError>;
    fn send(&mut self, channel_id: &str, payload: &JsonValue) -> Result<(), RuntimeError>;
    fn react(&mut self, channel_id: &str, message_id: &str, emoji: &str) -> Result<(), RuntimeError>;
    fn delete(&mut self, channel_id: &str, message_id: &str) -> Result<(), RuntimeError>;
    fn set_presence(&mut self, status: &str, activity: Option<&str>) -> Result<(), RuntimeError>;
    /// Messages received since the last poll.
    fn poll_messages(&mut self) -> Result<Vec<IncomingMessage>, RuntimeError>;
    fn disconnect(&mut self);
}

/// Talks to the Discord HTTP API and polls configured channels.
pub struct RestGateway {
    agent: ureq::Agent,
    api_base: String,
    authorization: String,
    channels: Vec<String>,
    last_seen: HashMap<String, String>,
    poll_interval: Duration,
    last_poll: Option<Instant>,
    user_id: Option<String>,
}

impl RestGateway {
    pub fn new(api_base: &str, token: &str, channels: Vec<String>, poll_interval: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(HTTP_TIMEOUT).build(),
            api_base: api_base.trim_end_matches('/').to_string(),
            authorization: format!("Bot {token}"),
            channels,
            last_seen: HashMap::new(),
            poll_interval,
            last_poll: None,
            user_id: None,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    fn get_json(&self, path: &str) -> Result<JsonValue, RuntimeError> {
        let response = self
            .agent
            .get(&self.url(path))
            .set("Authorization", &self.authorization)
            .call()?;
        response
            .into_json::<JsonValue>()
            .map_err(|error| RuntimeError::Network(error.to_string()))
    }

    fn poll_channel(&mut self, channel_id: &str) -> Result<Vec<IncomingMessage>, RuntimeError> {
        let after = self.last_seen.get(channel_id).cloned();
        let path = match &after {
            Some(id) => format!("/channels/{channel_id}/messages?limit=50&after={id}"),
            None => format!("/channels/{channel_id}/messages?limit=1"),
        };
        let JsonValue::Array(raw) = self.get_json(&path)? else {
            return Ok(Vec::new());
        };

        // Newest first on the wire.
        let mut messages: Vec<IncomingMessage> = raw
            .iter()
            .rev()
            .filter_map(|message| {
                Some(IncomingMessage {
                    id: message.get("id")?.as_str()?.to_string(),
                    channel_id: channel_id.to_string(),
                    author: message
                        .pointer("/author/username")
                        .and_then(JsonValue::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    content: message
                        .get("content")
                        .and_then(JsonValue::as_str)
                        .unwrap_or_default()
                        .to_string(),
                })
            })
            .collect();
        if let Some(latest) = messages.last() {
            self.last_seen.insert(channel_id.to_string(), latest.id.clone());
        }
        if after.is_none() {
            // First poll only records the position; history is not replayed.
            return Ok(Vec::new());
        }
        let own_id = self.user_id.clone();
        messages.retain(|message| {
            raw.iter().all(|value| {
                value.get("id").and_then(JsonValue::as_str) != Some(message.id.as_str())
                    || value.pointer("/author/id").and_then(JsonValue::as_str) != own_id.as_deref()
            })
        });
        Ok(messages)
    }
}

impl Gateway for RestGateway {
    fn name(&self) -> &str {
        "discord"
    }

    fn is_online(&self) -> bool {
        true
    }

    fn connect(&mut self) -> Result<(), RuntimeError> {
        let me = self.get_json("/users/@me")?;
        self.user_id = me.get("id").and_then(JsonValue::as_str).map(str::to_string);
        tracing::info!(
            user = me.get("username").and_then(JsonValue::as_str).unwrap_or("?"),
            "bot connected"
        );
        Ok(())
    }

    fn send(&mut self, channel_id: &str, payload: &JsonValue) -> Result<(), RuntimeError> {
        self.agent
            .post(&self.url(&format!("/channels/{channel_id}/messages")))
            .set("Authorization", &self.authorization)
            .send_json(payload.clone())?;
        Ok(())
    }

    fn react(&mut self, channel_id: &str, message_id: &str, emoji: &str) -> Result<(), RuntimeError> {
        let path = format!(
            "/channels/{channel_id}/messages/{message_id}/reactions/{}/@me",
            encode_path_segment(emoji)
        );
        self.agent
            .put(&self.url(&path))
            .set("Authorization", &self.authorization)
            .call()?;
        Ok(())
    }

    fn delete(&mut self, channel_id: &str, message_id: &str) -> Result<(), RuntimeError> {
        self.agent
            .delete(&self.url(&format!("/channels/{channel_id}/messages/{message_id}")))
            .set("Authorization", &self.authorization)
            .call()?;
        Ok(())
    }

    fn set_presence(&mut self, status: &str, activity: Option<&str>) -> Result<(), RuntimeError> {
        // Presence lives on the websocket gateway; the REST transport only records it.
        tracing::debug!(status, activity, "presence updated locally");
        Ok(())
    }

    fn poll_messages(&mut self) -> Result<Vec<IncomingMessage>, RuntimeError> {
        if self
            .last_poll
            .is_some_and(|last| last.elapsed() < self.poll_interval)
        {
            return Ok(Vec::new());
        }
        self.last_poll = Some(Instant::now());

        let mut received = Vec::new();
        for channel_id in self.channels.clone() {
            match self.poll_channel(&channel_id) {
                Ok(messages) => received.extend(messages),
                Err(error) => tracing::warn!(channel = %channel_id, %error, "channel poll failed"),
            }
        }
        Ok(received)
    }

    fn disconnect(&mut self) {
        tracing::info!("bot disconnected");
    }
}

/// Stand-in used without valid credentials. Nothing leaves the process.
#[derive(Debug, Default)]
pub struct OfflineGateway {
    inbox: VecDeque<IncomingMessage>,
}

impl OfflineGateway {
    pub fn queue(&mut self, message: IncomingMessage) {
        self.inbox.push_back(message);
    }
}

impl Gateway for OfflineGateway {
    fn name(&self) -> &str {
        "hors-ligne"
    }

    fn is_online(&self) -> bool {
        false
    }

    fn connect(&mut self) -> Result<(), RuntimeError> {
        Ok(())
    }

    fn send(&mut self, _: &str, _: &JsonValue) -> Result<(), RuntimeError> {
        Ok(())
    }

    fn react(&mut self, _: &str, _: &str, _: &str) -> Result<(), RuntimeError> {
        Ok(())
    }

    fn delete(&mut self, _: &str, _: &str) -> Result<(), RuntimeError> {
        Ok(())
    }

    fn set_presence(&mut self, _: &str, _: Option<&str>) -> Result<(), RuntimeError> {
        Ok(())
    }

    fn poll_messages(&mut self) -> Result<Vec<IncomingMessage>, RuntimeError> {
        Ok(self.inbox.drain(..).collect())
    }

    fn disconnect(&mut self) {}
}

fn encode_path_segment(segment: &str) -> String {
    segment
        .bytes()
        .map(|byte| match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b':' => {
                (byte as char).to_string()
            }
            _ => format!("%{byte:02X}"),
        })
        .collect()
}

//=============================================
//            Section 2: Bot State
//=============================================

struct BotSettings {
    intents: u64,
    channels: Vec<String>,
    poll_interval: Duration,
}

impl BotSettings {
    fn from_options(options: &Bindings, poll_interval: Duration) -> Result<Self, RuntimeError> {
        let intents = match options.get("intentions") {
            Some(value) => expect_number(value, "creerBot")? as u64,
            None => DEFAULT_INTENTS,
        };
        let channels = match options.get("salons") {
            Some(value) => expect_list(value, "creerBot")?
                .iter()
                .map(Value::to_string)
                .collect(),
            None => Vec::new(),
        };
        Ok(Self {
            intents,
            channels,
            poll_interval,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
struct SentMessage {
    channel_id: String,
    payload: JsonValue,
}

struct BotState {
    settings: BotSettings,
    gateway: Box<dyn Gateway>,
    connected: bool,
    stop_requested: bool,
    message_handlers: Vec<Value>,
    ready_handlers: Vec<Value>,
    commands: BTreeMap<String, Value>,
    status: String,
    activity: Option<String>,
    sent: Vec<SentMessage>,
    simulated_ids: u64,
}

impl BotState {
    fn new(settings: BotSettings, gateway: Box<dyn Gateway>) -> Self {
        Self {
            settings,
            gateway,
            connected: false,
            stop_requested: false,
            message_handlers: Vec::new(),
            ready_handlers: Vec::new(),
            commands: BTreeMap::new(),
            status: "en ligne".to_string(),
            activity: None,
            sent: Vec::new(),
            simulated_ids: 0,
        }
    }

    /// Record the message, then hand it to the gateway.
    fn send(&mut self, channel_id: &str, content: &Value) -> Result<(), RuntimeError> {
        let payload = message_payload(content);
        self.sent.push(SentMessage {
            channel_id: channel_id.to_string(),
            payload: payload.clone(),
        });
        self.gateway.send(channel_id, &payload)
    }
}

type SharedBot = Rc<RefCell<BotState>>;

/// Text becomes `content`; embed, button and menu maps become components.
fn message_payload(content: &Value) -> JsonValue {
    let Value::Map(map) = content else {
        return json!({ "content": content.to_string() });
    };
    match map.get("type").and_then(Value::as_str) {
        Some("embed") => {
            let fields: Vec<JsonValue> = match map.get("champs") {
                Some(Value::List(fields)) => fields
                    .iter()
                    .filter_map(Value::as_map)
                    .map(|field| {
                        json!({
                            "name": field.get("nom").map(Value::to_string).unwrap_or_default(),
                            "value": field.get("valeur").map(Value::to_string).unwrap_or_default(),
                            "inline": field.get("enLigne").is_some_and(Value::is_truthy),
                        })
                    })
                    .collect(),
                _ => Vec::new(),
            };
            json!({
                "embeds": [{
                    "title": map.get("titre").map(Value::to_string).unwrap_or_default(),
                    "description": map.get("description").map(Value::to_string).unwrap_or_default(),
                    "color": map.get("couleur").and_then(Value::to_number).unwrap_or_default() as u64,
                    "fields": fields,
                }]
            })
        }
        Some("bouton") => json!({
            "content": map.get("contenu").map(Value::to_string).unwrap_or_default(),
            "components": [{
                "type": 1,
                "components": [{
                    "type": 2,
                    "style": 1,
                    "label": map.get("libelle").map(Value::to_string).unwrap_or_default(),
                    "custom_id": map.get("id").map(Value::to_string).unwrap_or_default(),
                }]
            }]
        }),
        Some("menu") => json!({
            "content": map.get("contenu").map(Value::to_string).unwrap_or_default(),
            "components": [{
                "type": 1,
                "components": [{
                    "type": 3,
                    "custom_id": map.get("id").map(Value::to_string).unwrap_or_default(),
                    "options": match map.get("options") {
                        Some(Value::List(options)) => options
                            .iter()
                            .map(|option| json!({ "label": option.to_string(), "value": option.to_string() }))
                            .collect::<Vec<_>>(),
                        _ => Vec::new(),
                    },
                }]
            }]
        }),
        _ => json!({ "content": value_to_json(content).to_string() }),
    }
}

//=============================================
//            Section 3: Script Bindings
//=============================================

fn bot_value(state: SharedBot) -> Value {
    let mut entries: Vec<(&str, Value)> = Vec::new();

    let handlers = Rc::clone(&state);
    entries.push((
        "surMessage",
        Value::native("surMessage", NativeArity::Exact(1), move |_, args| {
            let handler = expect_callable(&arg(args, 0), "surMessage")?;
            handlers.borrow_mut().message_handlers.push(handler);
            Ok(Value::Null)
        }),
    ));

    let ready = Rc::clone(&state);
    entries.push((
        "surPret",
        Value::native("surPret", NativeArity::Exact(1), move |_, args| {
            let handler = expect_callable(&arg(args, 0), "surPret")?;
            ready.borrow_mut().ready_handlers.push(handler);
            Ok(Value::Null)
        }),
    ));

    let commands = Rc::clone(&state);
    entries.push((
        "commande",
        Value::native("commande", NativeArity::between(2, 3), move |_, args| {
            let name = expect_text(&arg(args, 0), "commande")?;
            let handler = expect_callable(&arg(args, 1), "commande")?;
            let name = name.trim_start_matches('/').to_string();
            tracing::debug!(command = %name, "slash command registered");
            commands.borrow_mut().commands.insert(name, handler);
            Ok(Value::Null)
        }),
    ));

    let status = Rc::clone(&state);
    entries.push((
        "statut",
        Value::native("statut", NativeArity::Exact(1), move |_, args| {
            let mut bot = status.borrow_mut();
            bot.status = expect_text(&arg(args, 0), "statut")?;
            let (status, activity) = (bot.status.clone(), bot.activity.clone());
            bot.gateway.set_presence(&status, activity.as_deref())?;
            Ok(Value::Null)
        }),
    ));

    let activity = Rc::clone(&state);
    entries.push((
        "activite",
        Value::native("activite", NativeArity::Exact(1), move |_, args| {
            let mut bot = activity.borrow_mut();
            bot.activity = Some(expect_text(&arg(args, 0), "activite")?);
            let (status, activity) = (bot.status.clone(), bot.activity.clone());
            bot.gateway.set_presence(&status, activity.as_deref())?;
            Ok(Value::Null)
        }),
    ));

    let connect = Rc::clone(&state);
    entries.push((
        "connecter",
        Value::native("connecter", NativeArity::Exact(0), move |interpreter, _| {
            connect_bot(interpreter, &connect)
        }),
    ));

    let disconnect = Rc::clone(&state);
    entries.push((
        "deconnecter",
        Value::native("deconnecter", NativeArity::Exact(0), move |_, _| {
            let mut bot = disconnect.borrow_mut();
            bot.stop_requested = true;
            if bot.connected {
                bot.connected = false;
                bot.gateway.disconnect();
            }
            Ok(Value::Null)
        }),
    ));

    let send = Rc::clone(&state);
    entries.push((
        "envoyer",
        Value::native("envoyer", NativeArity::Exact(2), move |_, args| {
            let channel = arg(args, 0).to_string();
            send.borrow_mut().send(&channel, &arg(args, 1))?;
            Ok(Value::Null)
        }),
    ));

    let simulate = Rc::clone(&state);
    entries.push((
        "simulerMessage",
        Value::native("simulerMessage", NativeArity::between(1, 3), move |interpreter, args| {
            let message = {
                let mut bot = simulate.borrow_mut();
                bot.simulated_ids += 1;
                IncomingMessage {
                    id: format!("simulation-{}", bot.simulated_ids),
                    channel_id: match arg(args, 2) {
                        Value::Null => "general".to_string(),
                        value => value.to_string(),
                    },
                    author: match arg(args, 1) {
                        Value::Null => "utilisateur".to_string(),
                        value => value.to_string(),
                    },
                    content: arg(args, 0).to_string(),
                }
            };
            dispatch_message(interpreter, &simulate, message)?;
            Ok(Value::Null)
        }),
    ));

    let outbox = Rc::clone(&state);
    entries.push((
        "messagesEnvoyes",
        Value::native("messagesEnvoyes", NativeArity::Exact(0), move |_, _| {
            let sent = outbox
                .borrow()
                .sent
                .iter()
                .map(|message| {
                    let content = message
                        .payload
                        .get("content")
                        .and_then(JsonValue::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| message.payload.to_string());
                    map_of([
                        ("salon", Value::text(message.channel_id.clone())),
                        ("contenu", Value::text(content)),
                    ])
                })
                .collect();
            Ok(Value::List(sent))
        }),
    ));

    let info = Rc::clone(&state);
    entries.push((
        "enLigne",
        Value::native("enLigne", NativeArity::Exact(0), move |_, _| {
            let bot = info.borrow();
            Ok(Value::Bool(bot.connected && bot.gateway.is_online()))
        }),
    ));

    let intents = state.borrow().settings.intents;
    entries.push(("intentions", Value::Number(intents as f64)));
    map_of(entries)
}

fn connect_bot(interpreter: &mut Interpreter, state: &SharedBot) -> Result<Value, RuntimeError> {
    {
        let mut bot = state.borrow_mut();
        if bot.connected {
            return Ok(Value::Null);
        }
        if let Err(error) = bot.gateway.connect() {
            tracing::warn!(%error, "bot connection failed, switching to offline gateway");
            bot.gateway = Box::new(OfflineGateway::default());
        }
        bot.connected = true;
        bot.stop_requested = false;
    }

    let (handlers, gateway) = {
        let bot = state.borrow();
        (bot.ready_handlers.clone(), bot.gateway.name().to_string())
    };
    let info = map_of([("passerelle", Value::text(gateway.clone()))]);
    for handler in handlers {
        interpreter.call_value(&handler, vec![info.clone()])?;
    }

    if interpreter.is_persistent() {
        interpreter.register_task(Box::new(BotTask {
            state: Rc::clone(state),
        }));
    } else {
        interpreter.print_line(format!(
            "Bot connecté via la passerelle {gateway} (utilisez `neko demarrer` pour le garder actif)"
        ));
    }
    Ok(Value::Null)
}

/// Slash commands win over plain message handlers.
fn dispatch_message(
    interpreter: &mut Interpreter,
    state: &SharedBot,
    message: IncomingMessage,
) -> Result<(), RuntimeError> {
    let message_value = message_value(state, &message);

    if let Some(command_line) = message.content.strip_prefix('/') {
        let mut words = command_line.split_whitespace();
        let name = words.next().unwrap_or_default();
        let command = state.borrow().commands.get(name).cloned();
        if let Some(handler) = command {
            let arguments = Value::List(words.map(Value::text).collect());
            interpreter.call_value(&handler, vec![message_value, arguments])?;
            return Ok(());
        }
    }

    let handlers = state.borrow().message_handlers.clone();
    for handler in handlers {
        interpreter.call_value(&handler, vec![message_value.clone()])?;
    }
    Ok(())
}

fn message_value(state: &SharedBot, message: &IncomingMessage) -> Value {
    let channel = message.channel_id.clone();
    let message_id = message.id.clone();

    let reply = {
        let state = Rc::clone(state);
        let channel = channel.clone();
        Value::native("repondre", NativeArity::Exact(1), move |_, args| {
            state.borrow_mut().send(&channel, &arg(args, 0))?;
            Ok(Value::Null)
        })
    };
    let react = {
        let state = Rc::clone(state);
        let (channel, message_id) = (channel.clone(), message_id.clone());
        Value::native("reagir", NativeArity::Exact(1), move |_, args| {
            let emoji = expect_text(&arg(args, 0), "reagir")?;
            state.borrow_mut().gateway.react(&channel, &message_id, &emoji)?;
            Ok(Value::Null)
        })
    };
    let delete = {
        let state = Rc::clone(state);
        let (channel, message_id) = (channel.clone(), message_id.clone());
        Value::native("supprimer", NativeArity::Exact(0), move |_, _| {
            state.borrow_mut().gateway.delete(&channel, &message_id)?;
            Ok(Value::Null)
        })
    };
    let send_to = {
        let state = Rc::clone(state);
        Value::native("envoyerDans", NativeArity::Exact(2), move |_, args| {
            let target = arg(args, 0).to_string();
            state.borrow_mut().send(&target, &arg(args, 1))?;
            Ok(Value::Null)
        })
    };

    map_of([
        ("contenu", Value::text(message.content.clone())),
        ("auteur", Value::text(message.author.clone())),
        ("salon", Value::text(channel)),
        ("id", Value::text(message_id)),
        ("repondre", reply),
        ("reagir", react),
        ("supprimer", delete),
        ("envoyerDans", send_to),
    ])
}

//=============================================
//            Section 4: Bot Host Task
//=============================================

struct BotTask {
    state: SharedBot,
}

impl HostTask for BotTask {
    fn name(&self) -> &str {
        "bot-messagerie"
    }

    fn poll(&mut self, interpreter: &mut Interpreter) -> Result<TaskStatus, RuntimeError> {
        let messages = {
            let mut bot = self.state.borrow_mut();
            if bot.stop_requested || !bot.connected {
                return Ok(TaskStatus::Done);
            }
            match bot.gateway.poll_messages() {
                Ok(messages) => messages,
                Err(error) => {
                    tracing::warn!(%error, "message poll failed");
                    Vec::new()
                }
            }
        };

        for message in messages {
            if let Err(error) = dispatch_message(interpreter, &self.state, message) {
                tracing::warn!(%error, "message handler failed");
            }
        }
        Ok(TaskStatus::Pending)
    }

    fn shutdown(&mut self, _: &mut Interpreter) {
        let mut bot = self.state.borrow_mut();
        if bot.connected {
            bot.connected = false;
            bot.gateway.disconnect();
        }
        tracing::info!(poll_interval_ms = bot.settings.poll_interval.as_millis() as u64, "bot task stopped");
    }
}
