//! Sheets tool definitions and dispatch
//!
//! Each tool is a pure request/response translator: pull arguments out of
//! the call, build the REST request, hand the API's JSON back. No tool holds
//! state; the bearer token arrives per call from the boundary layer.

use reqwest::Method;
use serde_json::{Map, Value, json};
use url::form_urlencoded;

use super::api::SheetsClient;
use crate::error::rpc_codes;
use crate::protocol::{Tool, ToolAnnotations};
use crate::{Error, Result};

/// All tools exposed by this server, in registration order
#[must_use]
pub fn all() -> Vec<Tool> {
    vec![
        tool(
            "spreadsheet_get",
            "Get spreadsheet",
            "Get spreadsheet metadata including title, sheets list, and optionally cell data",
            json!({
                "type": "object",
                "properties": {
                    "spreadsheetId": {
                        "type": "string",
                        "description": "The ID of the spreadsheet to retrieve"
                    },
                    "includeGridData": {
                        "type": "boolean",
                        "default": false,
                        "description": "Whether to include grid data (cell values). Default false for metadata only."
                    },
                    "ranges": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Ranges to return grid data for (e.g., \"Sheet1!A1:B10\"). Only used if includeGridData is true."
                    }
                },
                "required": ["spreadsheetId"]
            }),
            true,
        ),
        tool(
            "spreadsheet_create",
            "Create spreadsheet",
            "Create a new Google Sheets spreadsheet",
            json!({
                "type": "object",
                "properties": {
                    "title": {
                        "type": "string",
                        "description": "Title of the new spreadsheet"
                    },
                    "sheets": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "title": {"type": "string", "description": "Title of the sheet"}
                            },
                            "required": ["title"]
                        },
                        "description": "Initial sheets to create. If not provided, a default \"Sheet1\" is created."
                    }
                },
                "required": ["title"]
            }),
            false,
        ),
        tool(
            "sheets_values_get",
            "Get values",
            "Read cell values from a spreadsheet range",
            json!({
                "type": "object",
                "properties": {
                    "spreadsheetId": {
                        "type": "string",
                        "description": "The ID of the spreadsheet"
                    },
                    "range": {
                        "type": "string",
                        "description": "The A1 notation of the range to read (e.g., \"Sheet1!A1:D10\", \"Sheet1\", \"A1:D10\")"
                    },
                    "majorDimension": {
                        "type": "string",
                        "enum": ["ROWS", "COLUMNS"],
                        "default": "ROWS",
                        "description": "Whether to return data as rows or columns"
                    },
                    "valueRenderOption": {
                        "type": "string",
                        "enum": ["FORMATTED_VALUE", "UNFORMATTED_VALUE", "FORMULA"],
                        "default": "FORMATTED_VALUE",
                        "description": "How values should be rendered"
                    },
                    "dateTimeRenderOption": {
                        "type": "string",
                        "enum": ["SERIAL_NUMBER", "FORMATTED_STRING"],
                        "default": "FORMATTED_STRING",
                        "description": "How dates should be rendered"
                    }
                },
                "required": ["spreadsheetId", "range"]
            }),
            true,
        ),
        tool(
            "values_batch_get",
            "Batch get values",
            "Read cell values from multiple ranges in a single request",
            json!({
                "type": "object",
                "properties": {
                    "spreadsheetId": {
                        "type": "string",
                        "description": "The ID of the spreadsheet"
                    },
                    "ranges": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Array of A1 notation ranges to read (e.g., [\"Sheet1!A1:D10\", \"Sheet2!A:A\"])"
                    },
                    "majorDimension": {
                        "type": "string",
                        "enum": ["ROWS", "COLUMNS"],
                        "default": "ROWS",
                        "description": "Whether to return data as rows or columns"
                    },
                    "valueRenderOption": {
                        "type": "string",
                        "enum": ["FORMATTED_VALUE", "UNFORMATTED_VALUE", "FORMULA"],
                        "default": "FORMATTED_VALUE",
                        "description": "How values should be rendered"
                    },
                    "dateTimeRenderOption": {
                        "type": "string",
                        "enum": ["SERIAL_NUMBER", "FORMATTED_STRING"],
                        "default": "FORMATTED_STRING",
                        "description": "How dates should be rendered"
                    }
                },
                "required": ["spreadsheetId", "ranges"]
            }),
            true,
        ),
        tool(
            "values_update",
            "Update values",
            "Write cell values to a spreadsheet range (overwrites existing data)",
            json!({
                "type": "object",
                "properties": {
                    "spreadsheetId": {
                        "type": "string",
                        "description": "The ID of the spreadsheet"
                    },
                    "range": {
                        "type": "string",
                        "description": "The A1 notation of the range to update (e.g., \"Sheet1!A1:D10\")"
                    },
                    "values": {
                        "type": "array",
                        "items": {"type": "array"},
                        "description": "The data to write, as a 2D array of values (rows of columns)"
                    },
                    "valueInputOption": {
                        "type": "string",
                        "enum": ["RAW", "USER_ENTERED"],
                        "default": "USER_ENTERED",
                        "description": "How input data should be interpreted: RAW (as-is) or USER_ENTERED (parsed like typed in UI)"
                    },
                    "includeValuesInResponse": {
                        "type": "boolean",
                        "default": false,
                        "description": "Whether to include the updated values in the response"
                    }
                },
                "required": ["spreadsheetId", "range", "values"]
            }),
            false,
        ),
        tool(
            "values_batch_update",
            "Batch update values",
            "Write cell values to multiple ranges in a single request",
            json!({
                "type": "object",
                "properties": {
                    "spreadsheetId": {
                        "type": "string",
                        "description": "The ID of the spreadsheet"
                    },
                    "data": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "range": {
                                    "type": "string",
                                    "description": "The A1 notation of the range to update"
                                },
                                "values": {
                                    "type": "array",
                                    "items": {"type": "array"},
                                    "description": "The data to write"
                                }
                            },
                            "required": ["range", "values"]
                        },
                        "description": "Array of range/values pairs to update"
                    },
                    "valueInputOption": {
                        "type": "string",
                        "enum": ["RAW", "USER_ENTERED"],
                        "default": "USER_ENTERED",
                        "description": "How input data should be interpreted"
                    },
                    "includeValuesInResponse": {
                        "type": "boolean",
                        "default": false,
                        "description": "Whether to include the updated values in the response"
                    }
                },
                "required": ["spreadsheetId", "data"]
            }),
            false,
        ),
        tool(
            "values_append",
            "Append values",
            "Append rows of data after the last row with data in a range",
            json!({
                "type": "object",
                "properties": {
                    "spreadsheetId": {
                        "type": "string",
                        "description": "The ID of the spreadsheet"
                    },
                    "range": {
                        "type": "string",
                        "description": "The A1 notation of a range to search for data. Data will be appended after the last row with data in this range (e.g., \"Sheet1!A:A\" to append to column A, or \"Sheet1\" to append to the sheet)"
                    },
                    "values": {
                        "type": "array",
                        "items": {"type": "array"},
                        "description": "The data to append, as a 2D array of values (rows of columns)"
                    },
                    "valueInputOption": {
                        "type": "string",
                        "enum": ["RAW", "USER_ENTERED"],
                        "default": "USER_ENTERED",
                        "description": "How input data should be interpreted"
                    },
                    "insertDataOption": {
                        "type": "string",
                        "enum": ["OVERWRITE", "INSERT_ROWS"],
                        "default": "INSERT_ROWS",
                        "description": "How to handle existing data: OVERWRITE writes over existing, INSERT_ROWS inserts new rows"
                    },
                    "includeValuesInResponse": {
                        "type": "boolean",
                        "default": false,
                        "description": "Whether to include the appended values in the response"
                    }
                },
                "required": ["spreadsheetId", "range", "values"]
            }),
            false,
        ),
        tool(
            "values_clear",
            "Clear values",
            "Clear cell values from a range (keeps formatting)",
            json!({
                "type": "object",
                "properties": {
                    "spreadsheetId": {
                        "type": "string",
                        "description": "The ID of the spreadsheet"
                    },
                    "range": {
                        "type": "string",
                        "description": "The A1 notation of the range to clear (e.g., \"Sheet1!A1:D10\")"
                    }
                },
                "required": ["spreadsheetId", "range"]
            }),
            false,
        ),
        tool(
            "sheets_list",
            "List sheets",
            "List all sheets (tabs) in a spreadsheet with their properties",
            json!({
                "type": "object",
                "properties": {
                    "spreadsheetId": {
                        "type": "string",
                        "description": "The ID of the spreadsheet"
                    }
                },
                "required": ["spreadsheetId"]
            }),
            true,
        ),
        tool(
            "sheet_add",
            "Add sheet",
            "Add a new sheet (tab) to a spreadsheet",
            json!({
                "type": "object",
                "properties": {
                    "spreadsheetId": {
                        "type": "string",
                        "description": "The ID of the spreadsheet"
                    },
                    "title": {
                        "type": "string",
                        "description": "Title of the new sheet"
                    },
                    "index": {
                        "type": "number",
                        "description": "The index to insert the sheet at. If not specified, appended to the end."
                    },
                    "rowCount": {
                        "type": "number",
                        "description": "Number of rows (default 1000)"
                    },
                    "columnCount": {
                        "type": "number",
                        "description": "Number of columns (default 26)"
                    }
                },
                "required": ["spreadsheetId", "title"]
            }),
            false,
        ),
        tool(
            "sheet_delete",
            "Delete sheet",
            "Delete a sheet (tab) from a spreadsheet",
            json!({
                "type": "object",
                "properties": {
                    "spreadsheetId": {
                        "type": "string",
                        "description": "The ID of the spreadsheet"
                    },
                    "sheetId": {
                        "type": "number",
                        "description": "The ID of the sheet to delete (not the title - use sheets_list to get sheet IDs)"
                    }
                },
                "required": ["spreadsheetId", "sheetId"]
            }),
            false,
        ),
        tool(
            "sheets_batch_update",
            "Batch update",
            "Execute multiple spreadsheet operations in a single request. Use for advanced operations like formatting, merging cells, creating filters, conditional formatting, sorting, etc.",
            json!({
                "type": "object",
                "properties": {
                    "spreadsheetId": {
                        "type": "string",
                        "description": "The ID of the spreadsheet"
                    },
                    "requests": {
                        "type": "array",
                        "items": {"type": "object"},
                        "description": "Array of Sheets API request objects. Common requests include: updateCells, repeatCell, mergeCells, updateBorders, addConditionalFormatRule, sortRange, etc."
                    },
                    "includeSpreadsheetInResponse": {
                        "type": "boolean",
                        "default": false,
                        "description": "Whether to include the updated spreadsheet in the response"
                    }
                },
                "required": ["spreadsheetId", "requests"]
            }),
            false,
        ),
    ]
}

/// Dispatch a tools/call to the matching handler
pub async fn call(api: &SheetsClient, token: &str, name: &str, args: &Value) -> Result<Value> {
    match name {
        "spreadsheet_get" => spreadsheet_get(api, token, args).await,
        "spreadsheet_create" => spreadsheet_create(api, token, args).await,
        "sheets_values_get" => values_get(api, token, args).await,
        "values_batch_get" => values_batch_get(api, token, args).await,
        "values_update" => values_update(api, token, args).await,
        "values_batch_update" => values_batch_update(api, token, args).await,
        "values_append" => values_append(api, token, args).await,
        "values_clear" => values_clear(api, token, args).await,
        "sheets_list" => sheets_list(api, token, args).await,
        "sheet_add" => sheet_add(api, token, args).await,
        "sheet_delete" => sheet_delete(api, token, args).await,
        "sheets_batch_update" => batch_update(api, token, args).await,
        _ => Err(Error::json_rpc(
            rpc_codes::METHOD_NOT_FOUND,
            format!("Unknown tool: {name}"),
        )),
    }
}

fn tool(name: &str, title: &str, description: &str, input_schema: Value, read_only: bool) -> Tool {
    Tool {
        name: name.to_string(),
        title: Some(title.to_string()),
        description: Some(description.to_string()),
        input_schema,
        annotations: read_only.then(ToolAnnotations::read_only),
    }
}

// ── Argument extraction ───────────────────────────────────────────────────────

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key).and_then(Value::as_str).ok_or_else(|| {
        Error::json_rpc(
            rpc_codes::INVALID_PARAMS,
            format!("Missing required parameter: {key}"),
        )
    })
}

fn required_array<'a>(args: &'a Value, key: &str) -> Result<&'a Vec<Value>> {
    args.get(key).and_then(Value::as_array).ok_or_else(|| {
        Error::json_rpc(
            rpc_codes::INVALID_PARAMS,
            format!("Missing required parameter: {key}"),
        )
    })
}

fn required_i64(args: &Value, key: &str) -> Result<i64> {
    args.get(key).and_then(Value::as_i64).ok_or_else(|| {
        Error::json_rpc(
            rpc_codes::INVALID_PARAMS,
            format!("Missing required parameter: {key}"),
        )
    })
}

fn str_or<'a>(args: &'a Value, key: &str, default: &'a str) -> &'a str {
    args.get(key).and_then(Value::as_str).unwrap_or(default)
}

fn bool_or(args: &Value, key: &str, default: bool) -> bool {
    args.get(key).and_then(Value::as_bool).unwrap_or(default)
}

/// Percent-encode an A1 range for use inside a path segment
fn encode_range(range: &str) -> String {
    urlencoding::encode(range).into_owned()
}

// ── Handlers ──────────────────────────────────────────────────────────────────

async fn spreadsheet_get(api: &SheetsClient, token: &str, args: &Value) -> Result<Value> {
    let spreadsheet_id = required_str(args, "spreadsheetId")?;

    let query = {
        let mut params = form_urlencoded::Serializer::new(String::new());
        if bool_or(args, "includeGridData", false) {
            params.append_pair("includeGridData", "true");
        }
        if let Some(ranges) = args.get("ranges").and_then(Value::as_array) {
            for range in ranges.iter().filter_map(Value::as_str) {
                params.append_pair("ranges", range);
            }
        }
        params.finish()
    };
    let path = if query.is_empty() {
        format!("/spreadsheets/{spreadsheet_id}")
    } else {
        format!("/spreadsheets/{spreadsheet_id}?{query}")
    };
    api.call(Method::GET, &path, token, None).await
}

async fn spreadsheet_create(api: &SheetsClient, token: &str, args: &Value) -> Result<Value> {
    let title = required_str(args, "title")?;

    let mut body = Map::new();
    body.insert("properties".to_string(), json!({"title": title}));

    if let Some(sheets) = args.get("sheets").and_then(Value::as_array) {
        if !sheets.is_empty() {
            let sheets: Vec<Value> = sheets
                .iter()
                .map(|sheet| json!({"properties": {"title": sheet.get("title")}}))
                .collect();
            body.insert("sheets".to_string(), Value::Array(sheets));
        }
    }

    api.call(Method::POST, "/spreadsheets", token, Some(&Value::Object(body)))
        .await
}

async fn values_get(api: &SheetsClient, token: &str, args: &Value) -> Result<Value> {
    let spreadsheet_id = required_str(args, "spreadsheetId")?;
    let range = required_str(args, "range")?;

    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("majorDimension", str_or(args, "majorDimension", "ROWS"))
        .append_pair(
            "valueRenderOption",
            str_or(args, "valueRenderOption", "FORMATTED_VALUE"),
        )
        .append_pair(
            "dateTimeRenderOption",
            str_or(args, "dateTimeRenderOption", "FORMATTED_STRING"),
        )
        .finish();

    let path = format!(
        "/spreadsheets/{spreadsheet_id}/values/{}?{query}",
        encode_range(range)
    );
    api.call(Method::GET, &path, token, None).await
}

async fn values_batch_get(api: &SheetsClient, token: &str, args: &Value) -> Result<Value> {
    let spreadsheet_id = required_str(args, "spreadsheetId")?;
    let ranges = required_array(args, "ranges")?;

    let query = {
        let mut params = form_urlencoded::Serializer::new(String::new());
        params
            .append_pair("majorDimension", str_or(args, "majorDimension", "ROWS"))
            .append_pair(
                "valueRenderOption",
                str_or(args, "valueRenderOption", "FORMATTED_VALUE"),
            )
            .append_pair(
                "dateTimeRenderOption",
                str_or(args, "dateTimeRenderOption", "FORMATTED_STRING"),
            );
        for range in ranges.iter().filter_map(Value::as_str) {
            params.append_pair("ranges", range);
        }
        params.finish()
    };
    let path = format!("/spreadsheets/{spreadsheet_id}/values:batchGet?{query}");
    api.call(Method::GET, &path, token, None).await
}

async fn values_update(api: &SheetsClient, token: &str, args: &Value) -> Result<Value> {
    let spreadsheet_id = required_str(args, "spreadsheetId")?;
    let range = required_str(args, "range")?;
    let values = required_array(args, "values")?;

    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair(
            "valueInputOption",
            str_or(args, "valueInputOption", "USER_ENTERED"),
        )
        .append_pair(
            "includeValuesInResponse",
            if bool_or(args, "includeValuesInResponse", false) {
                "true"
            } else {
                "false"
            },
        )
        .finish();

    let path = format!(
        "/spreadsheets/{spreadsheet_id}/values/{}?{query}",
        encode_range(range)
    );
    api.call(Method::PUT, &path, token, Some(&json!({"values": values})))
        .await
}

async fn values_batch_update(api: &SheetsClient, token: &str, args: &Value) -> Result<Value> {
    let spreadsheet_id = required_str(args, "spreadsheetId")?;
    let data = required_array(args, "data")?;

    let body = json!({
        "valueInputOption": str_or(args, "valueInputOption", "USER_ENTERED"),
        "includeValuesInResponse": bool_or(args, "includeValuesInResponse", false),
        "data": data,
    });

    let path = format!("/spreadsheets/{spreadsheet_id}/values:batchUpdate");
    api.call(Method::POST, &path, token, Some(&body)).await
}

async fn values_append(api: &SheetsClient, token: &str, args: &Value) -> Result<Value> {
    let spreadsheet_id = required_str(args, "spreadsheetId")?;
    let range = required_str(args, "range")?;
    let values = required_array(args, "values")?;

    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair(
            "valueInputOption",
            str_or(args, "valueInputOption", "USER_ENTERED"),
        )
        .append_pair(
            "insertDataOption",
            str_or(args, "insertDataOption", "INSERT_ROWS"),
        )
        .append_pair(
            "includeValuesInResponse",
            if bool_or(args, "includeValuesInResponse", false) {
                "true"
            } else {
                "false"
            },
        )
        .finish();

    let path = format!(
        "/spreadsheets/{spreadsheet_id}/values/{}:append?{query}",
        encode_range(range)
    );
    api.call(Method::POST, &path, token, Some(&json!({"values": values})))
        .await
}

async fn values_clear(api: &SheetsClient, token: &str, args: &Value) -> Result<Value> {
    let spreadsheet_id = required_str(args, "spreadsheetId")?;
    let range = required_str(args, "range")?;

    let path = format!(
        "/spreadsheets/{spreadsheet_id}/values/{}:clear",
        encode_range(range)
    );
    api.call(Method::POST, &path, token, Some(&json!({}))).await
}

async fn sheets_list(api: &SheetsClient, token: &str, args: &Value) -> Result<Value> {
    let spreadsheet_id = required_str(args, "spreadsheetId")?;

    let path = format!(
        "/spreadsheets/{spreadsheet_id}?fields=spreadsheetId,properties.title,sheets.properties"
    );
    let result = api.call(Method::GET, &path, token, None).await?;

    // Flatten the nested properties into one entry per sheet
    let sheets: Vec<Value> = result
        .get("sheets")
        .and_then(Value::as_array)
        .map(|sheets| {
            sheets
                .iter()
                .filter_map(|sheet| sheet.get("properties"))
                .map(|properties| {
                    json!({
                        "sheetId": properties.get("sheetId"),
                        "title": properties.get("title"),
                        "index": properties.get("index"),
                        "sheetType": properties.get("sheetType"),
                        "rowCount": properties.pointer("/gridProperties/rowCount"),
                        "columnCount": properties.pointer("/gridProperties/columnCount"),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(json!({
        "spreadsheetId": result.get("spreadsheetId"),
        "title": result.pointer("/properties/title"),
        "sheets": sheets,
    }))
}

async fn sheet_add(api: &SheetsClient, token: &str, args: &Value) -> Result<Value> {
    let spreadsheet_id = required_str(args, "spreadsheetId")?;
    let title = required_str(args, "title")?;

    let mut properties = Map::new();
    properties.insert("title".to_string(), json!(title));
    if let Some(index) = args.get("index").and_then(Value::as_i64) {
        properties.insert("index".to_string(), json!(index));
    }

    let mut grid = Map::new();
    if let Some(rows) = args.get("rowCount").and_then(Value::as_i64) {
        grid.insert("rowCount".to_string(), json!(rows));
    }
    if let Some(columns) = args.get("columnCount").and_then(Value::as_i64) {
        grid.insert("columnCount".to_string(), json!(columns));
    }
    if !grid.is_empty() {
        properties.insert("gridProperties".to_string(), Value::Object(grid));
    }

    let body = json!({
        "requests": [{"addSheet": {"properties": Value::Object(properties)}}]
    });

    let path = format!("/spreadsheets/{spreadsheet_id}:batchUpdate");
    let result = api.call(Method::POST, &path, token, Some(&body)).await?;

    let added = result
        .pointer("/replies/0/addSheet/properties")
        .ok_or_else(|| {
            Error::Protocol("batchUpdate response missing addSheet reply".to_string())
        })?;

    Ok(json!({
        "sheetId": added.get("sheetId"),
        "title": added.get("title"),
        "index": added.get("index"),
    }))
}

async fn sheet_delete(api: &SheetsClient, token: &str, args: &Value) -> Result<Value> {
    let spreadsheet_id = required_str(args, "spreadsheetId")?;
    let sheet_id = required_i64(args, "sheetId")?;

    let body = json!({
        "requests": [{"deleteSheet": {"sheetId": sheet_id}}]
    });

    let path = format!("/spreadsheets/{spreadsheet_id}:batchUpdate");
    api.call(Method::POST, &path, token, Some(&body)).await?;

    Ok(json!({
        "success": true,
        "deletedSheetId": sheet_id,
    }))
}

async fn batch_update(api: &SheetsClient, token: &str, args: &Value) -> Result<Value> {
    let spreadsheet_id = required_str(args, "spreadsheetId")?;
    let requests = required_array(args, "requests")?;

    let body = json!({
        "requests": requests,
        "includeSpreadsheetInResponse": bool_or(args, "includeSpreadsheetInResponse", false),
    });

    let path = format!("/spreadsheets/{spreadsheet_id}:batchUpdate");
    api.call(Method::POST, &path, token, Some(&body)).await
}
