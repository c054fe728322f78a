use crate::error::ProbeError;

pub const SUCCESS_BODY: &str = "DB Connected!";
pub const ERROR_PREFIX: &str = "Error: ";

/// 1 回のプローブ結果。レスポンスボディへの変換だけを担当する。
/// 成功・失敗どちらでも HTTP ステータスは 200 のままなので、区別はボディの文字列だけで行う。
#[derive(Debug)]
pub enum ProbeOutcome {
    Connected,
    Failed(ProbeError),
}

impl ProbeOutcome {
    pub fn body(&self) -> String {
        match self {
            ProbeOutcome::Connected => SUCCESS_BODY.to_string(),
            ProbeOutcome::Failed(err) => format!("{}{}", ERROR_PREFIX, err),
        }
    }
}

impl From<Result<(), ProbeError>> for ProbeOutcome {
    fn from(result: Result<(), ProbeError>) -> Self {
        match result {
            Ok(()) => ProbeOutcome::Connected,
            Err(err) => ProbeOutcome::Failed(err),
        }
    }
}
