//! Browser bindings. Wraps a [`Session`] behind a `wasm_bindgen`
//! façade the page scripts drive with plain JSON strings, and hooks
//! the relay WebSocket so inbound traffic feeds straight into the
//! session.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{MessageEvent, WebSocket};

use crate::geometry::{Point, WorldMap};
use crate::protocol::GameMessage;
use crate::session::Session;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    fn log(s: &str);
}

#[wasm_bindgen]
pub struct GameClient {
    session: Rc<RefCell<Session>>,
    socket: Option<WebSocket>,
}

fn send(socket: &Option<WebSocket>, message: &GameMessage) -> Result<(), JsValue> {
    if let Some(ws) = socket {
        let json = serde_json::to_string(message)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        ws.send_with_str(&json)?;
    }
    Ok(())
}

#[wasm_bindgen]
impl GameClient {
    /// `map_json` is the region document the page already fetched.
    #[wasm_bindgen(constructor)]
    pub fn new(player: &str, map_json: &str) -> Result<GameClient, JsValue> {
        let map = WorldMap::from_json(map_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(GameClient {
            session: Rc::new(RefCell::new(Session::new(player, map))),
            socket: None,
        })
    }

    /// Connects to the relay. Inbound messages apply to the session as
    /// they arrive; malformed ones are logged and dropped.
    pub fn connect(&mut self, url: &str) -> Result<(), JsValue> {
        let ws = WebSocket::new(url)?;
        let session = self.session.clone();
        let onmessage = Closure::wrap(Box::new(move |e: MessageEvent| {
            if let Ok(txt) = e.data().dyn_into::<js_sys::JsString>() {
                let txt: String = txt.into();
                match serde_json::from_str::<GameMessage>(&txt) {
                    Ok(msg) => {
                        for problem in session.borrow_mut().apply_remote(&msg) {
                            log(&format!("dropped record: {}", problem));
                        }
                    }
                    Err(e) => log(&format!("unreadable server message: {}", e)),
                }
            }
        }) as Box<dyn FnMut(MessageEvent)>);
        ws.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
        onmessage.forget();
        self.socket = Some(ws);
        Ok(())
    }

    pub fn spawn_unit(&self, region: &str) -> Result<String, JsValue> {
        let msg = self
            .session
            .borrow_mut()
            .spawn_unit(region)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        send(&self.socket, &msg)?;
        match msg {
            GameMessage::NewUnitCreated { server_id, .. } => Ok(server_id.unwrap_or_default()),
            _ => Ok(String::new()),
        }
    }

    pub fn select_unit(&self, id: &str) -> Result<(), JsValue> {
        self.session
            .borrow_mut()
            .select_unit(id)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    pub fn deselect(&self) {
        self.session.borrow_mut().deselect();
    }

    /// Stages a destination and returns the travel-time preview in
    /// seconds, for the info panel.
    pub fn set_destination(&self, x: f64, y: f64) -> Result<f64, JsValue> {
        self.session
            .borrow_mut()
            .set_destination(Point::new(x, y))
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    pub fn begin_move(&self) -> Result<(), JsValue> {
        let msg = self
            .session
            .borrow_mut()
            .begin_move()
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        send(&self.socket, &msg)
    }

    /// Animation-frame driver: advances travel by `dt` seconds and
    /// broadcasts the per-tick position reports.
    pub fn tick(&self, dt: f64) -> Result<(), JsValue> {
        let reports = self.session.borrow_mut().tick(dt);
        for msg in &reports {
            send(&self.socket, msg)?;
        }
        Ok(())
    }

    pub fn capture(&self) -> Result<(), JsValue> {
        let (_, broadcast) = self
            .session
            .borrow_mut()
            .capture()
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        send(&self.socket, &broadcast)
    }

    pub fn kill_unit(&self, id: &str) -> Result<(), JsValue> {
        self.session
            .borrow_mut()
            .kill_unit(id)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Region id under a world-space point, or the empty string. Used
    /// by the page for hover and click dispatch.
    pub fn region_at(&self, x: f64, y: f64) -> String {
        self.session
            .borrow()
            .map()
            .region_at(Point::new(x, y))
            .unwrap_or("")
            .to_string()
    }

    /// Current owner of a region as its wire string, or the empty
    /// string for unknown regions.
    pub fn owner_of(&self, region: &str) -> String {
        self.session
            .borrow()
            .ownership()
            .owner_of(region)
            .map(|o| o.as_wire().to_string())
            .unwrap_or_default()
    }

    /// All units as a JSON array for the renderer.
    pub fn units_json(&self) -> Result<String, JsValue> {
        let session = self.session.borrow();
        let units: Vec<serde_json::Value> = session
            .units()
            .iter()
            .map(|u| {
                serde_json::json!({
                    "id": u.id,
                    "owner": u.owner,
                    "x": u.position.x,
                    "y": u.position.y,
                    "health": u.health,
                    "traveling": u.is_traveling(),
                })
            })
            .collect();
        serde_json::to_string(&units).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    pub fn selected_unit(&self) -> String {
        self.session
            .borrow()
            .selected()
            .unwrap_or("")
            .to_string()
    }
}
