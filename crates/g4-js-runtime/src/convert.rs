//! JSON → JavaScript value conversion for event payloads.

use rquickjs::{Array, Ctx, IntoJs, Object, Value as JsValue};

use crate::error::{JsError, JsResult};

/// Convert a `serde_json::Value` into a value owned by `ctx`.
pub fn json_to_js<'js>(ctx: &Ctx<'js>, json: &serde_json::Value) -> JsResult<JsValue<'js>> {
    match json {
        serde_json::Value::Null => Ok(JsValue::new_null(ctx.clone())),
        serde_json::Value::Bool(b) => Ok(JsValue::new_bool(ctx.clone(), *b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64().and_then(|i| i32::try_from(i).ok()) {
                Ok(JsValue::new_int(ctx.clone(), i))
            } else if let Some(f) = n.as_f64() {
                Ok(JsValue::new_float(ctx.clone(), f))
            } else {
                Ok(JsValue::new_undefined(ctx.clone()))
            }
        }
        serde_json::Value::String(s) => s
            .as_str()
            .into_js(ctx)
            .map_err(|e| JsError::Conversion(e.to_string())),
        serde_json::Value::Array(arr) => {
            let js_arr = Array::new(ctx.clone()).map_err(|e| JsError::Conversion(e.to_string()))?;
            for (i, item) in arr.iter().enumerate() {
                js_arr
                    .set(i, json_to_js(ctx, item)?)
                    .map_err(|e| JsError::Conversion(e.to_string()))?;
            }
            Ok(js_arr.into_value())
        }
        serde_json::Value::Object(obj) => {
            let js_obj = Object::new(ctx.clone()).map_err(|e| JsError::Conversion(e.to_string()))?;
            for (key, val) in obj {
                js_obj
                    .set(key.as_str(), json_to_js(ctx, val)?)
                    .map_err(|e| JsError::Conversion(e.to_string()))?;
            }
            Ok(js_obj.into_value())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rquickjs::{Context, Function, Runtime};

    #[test]
    fn test_payload_shape_survives() {
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();

        context.with(|ctx| {
            let payload = serde_json::json!({
                "count": 3,
                "big": 5_000_000_000i64,
                "ratio": 0.5,
                "tags": ["a", "b"],
                "nested": { "ok": true, "none": null }
            });
            let value = json_to_js(&ctx, &payload).unwrap();

            let check: Function = ctx
                .eval(
                    r#"(p) => p.count === 3 && p.big === 5000000000 && p.ratio === 0.5
                        && p.tags.length === 2 && p.tags[1] === "b"
                        && p.nested.ok === true && p.nested.none === null"#,
                )
                .unwrap();
            let ok: bool = check.call((value,)).unwrap();
            assert!(ok);
        });
    }
}
