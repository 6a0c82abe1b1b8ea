use bitgrid::{Density, Level, VisualSink};
use js_sys::{Float32Array, Function, Object, Reflect, Uint8Array};
use wasm_bindgen::{JsCast, JsValue};

pub fn new_obj() -> Object { Object::new() }
pub fn set_kv(obj: &Object, k: &str, v: &JsValue) {
    let _ = Reflect::set(obj, &JsValue::from_str(k), v);
}
pub fn arr_f32(slice: &[f64]) -> Float32Array {
    let arr = Float32Array::new_with_length(slice.len() as u32);
    for (i, v) in slice.iter().enumerate() { arr.set_index(i as u32, *v as f32); }
    arr
}
pub fn arr_u8(slice: &[u8]) -> Uint8Array {
    let arr = Uint8Array::new_with_length(slice.len() as u32);
    arr.copy_from(slice); arr
}

pub fn warn(msg: &str) { web_sys::console::warn_1(&JsValue::from_str(msg)); }

fn method(target: &JsValue, name: &str) -> Option<Function> {
    Reflect::get(target, &JsValue::from_str(name)).ok()?.dyn_into::<Function>().ok()
}

/// Sink backed by a JS object. Methods the object lacks are skipped.
pub struct JsSink {
    target: JsValue,
    draw_byte_row: Option<Function>,
    draw_block_raster: Option<Function>,
    report_progress: Option<Function>,
    report_done: Option<Function>,
    clear: Option<Function>,
}

impl JsSink {
    pub fn new(target: JsValue) -> JsSink {
        JsSink {
            draw_byte_row: method(&target, "drawByteRow"),
            draw_block_raster: method(&target, "drawBlockRaster"),
            report_progress: method(&target, "reportProgress"),
            report_done: method(&target, "reportDone"),
            clear: method(&target, "clear"),
            target,
        }
    }

    fn report(name: &str, r: Result<JsValue, JsValue>) {
        if let Err(e) = r {
            let msg = e.as_string().unwrap_or_else(|| format!("{e:?}"));
            warn(&format!("sink.{name} threw: {msg}"));
        }
    }
}

impl VisualSink for JsSink {
    fn draw_byte_row(&mut self, index: u64, bits: [bool; 8]) {
        if let Some(f) = &self.draw_byte_row {
            let row = bits.map(u8::from);
            let r = f.call2(&self.target, &JsValue::from_f64(index as f64), &arr_u8(&row));
            JsSink::report("drawByteRow", r);
        }
    }

    fn draw_block_raster(&mut self, level: Level, index: u64, density: &Density) {
        if let Some(f) = &self.draw_block_raster {
            let value: JsValue = match density {
                Density::Aggregate(d) => JsValue::from_f64(*d),
                Density::Detailed(sub) => arr_f32(sub).into(),
            };
            let r = f.call3(&self.target, &JsValue::from_str(level.name()), &JsValue::from_f64(index as f64), &value);
            JsSink::report("drawBlockRaster", r);
        }
    }

    fn report_progress(&mut self, fraction: f64) {
        if let Some(f) = &self.report_progress {
            JsSink::report("reportProgress", f.call1(&self.target, &JsValue::from_f64(fraction)));
        }
    }

    fn report_done(&mut self) {
        if let Some(f) = &self.report_done {
            JsSink::report("reportDone", f.call0(&self.target));
        }
    }

    fn clear(&mut self) {
        if let Some(f) = &self.clear {
            JsSink::report("clear", f.call0(&self.target));
        }
    }
}
