use crate::interop::{new_obj, set_kv};
use bitgrid::{InputError, SummaryError};
use wasm_bindgen::prelude::*;

pub fn ok(v: JsValue) -> JsValue {
    let o = new_obj();
    set_kv(&o, "ok", &JsValue::from_bool(true));
    set_kv(&o, "value", &v);
    o.into()
}

pub fn err(code: &'static str, message: impl Into<String>, data: Option<JsValue>) -> JsValue {
    let root = new_obj();
    set_kv(&root, "ok", &JsValue::from_bool(false));
    let e = new_obj();
    set_kv(&e, "code", &JsValue::from_str(code));
    set_kv(&e, "message", &JsValue::from_str(&message.into()));
    if let Some(d) = data { set_kv(&e, "data", &d); }
    set_kv(&root, "error", &e.into());
    root.into()
}

#[inline]
pub fn input(param: &str, e: &InputError) -> JsValue {
    let d = new_obj();
    set_kv(&d, "param", &JsValue::from_str(param));
    err(e.code(), e.to_string(), Some(d.into()))
}

#[inline]
pub fn summary(e: &SummaryError) -> JsValue { err(e.code(), e.to_string(), None) }

#[inline]
pub fn no_session() -> JsValue { err("no_session", "no render has been started", None) }

#[inline]
pub fn stale_token(token: u64, current: u64) -> JsValue {
    let d = new_obj();
    set_kv(&d, "token", &JsValue::from_f64(token as f64));
    set_kv(&d, "current", &JsValue::from_f64(current as f64));
    err("stale_token", "render was superseded", Some(d.into()))
}
