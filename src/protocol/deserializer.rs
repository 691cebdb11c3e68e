use async_trait::async_trait;
use tokio::io::AsyncReadExt;

use super::{
    message::{Request, Response},
    MAX_FIELD_LEN,
};

#[async_trait]
pub trait Deserialize: Sized {
    type Error;

    // Deserialize a structure from a reader
    async fn deserialize<R: AsyncReadExt + Unpin + Send>(
        reader: &mut R,
    ) -> Result<Self, Self::Error>;
}

#[derive(thiserror::Error, Debug)]
pub enum DeserializeError {
    #[error("{0}")]
    Utf(#[from] std::string::FromUtf8Error),

    #[error("{0}")]
    Io(#[from] tokio::io::Error),

    #[error("A field of {0} bytes exceeds the limit")]
    TooLong(u64),
}

impl DeserializeError {
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::Io(err) if err.kind() == tokio::io::ErrorKind::UnexpectedEof)
    }
}

// `read_exact` already loops over partial reads and retries on interruption,
// And reports a zero-byte read as `UnexpectedEof`
async fn read_array<R, const N: usize>(reader: &mut R) -> tokio::io::Result<[u8; N]>
where
    R: AsyncReadExt + Unpin + Send,
{
    let mut raw = [0u8; N];
    reader.read_exact(&mut raw).await?;
    Ok(raw)
}

pub(crate) async fn read_i32_ne<R: AsyncReadExt + Unpin + Send>(
    reader: &mut R,
) -> tokio::io::Result<i32> {
    Ok(i32::from_ne_bytes(read_array(reader).await?))
}

pub(crate) async fn read_u64_ne<R: AsyncReadExt + Unpin + Send>(
    reader: &mut R,
) -> tokio::io::Result<u64> {
    Ok(u64::from_ne_bytes(read_array(reader).await?))
}

#[async_trait]
impl Deserialize for Vec<u8> {
    type Error = DeserializeError;

    async fn deserialize<R: AsyncReadExt + Unpin + Send>(
        reader: &mut R,
    ) -> Result<Self, Self::Error> {
        let length = read_u64_ne(reader).await?;

        // Refuse before allocating anything
        if length > MAX_FIELD_LEN as u64 {
            return Err(DeserializeError::TooLong(length));
        }

        let mut raw = vec![0u8; length as usize];
        if !raw.is_empty() {
            reader.read_exact(&mut raw).await?;
        }

        Ok(raw)
    }
}

#[async_trait]
impl Deserialize for Request {
    type Error = DeserializeError;

    async fn deserialize<R: AsyncReadExt + Unpin + Send>(
        reader: &mut R,
    ) -> Result<Self, Self::Error> {
        let action = read_i32_ne(reader).await?.into();

        // A zero-length username means the request is anonymous
        let username = Vec::<u8>::deserialize(reader).await?;
        let username = match username.is_empty() {
            true => None,
            false => Some(String::from_utf8(username)?),
        };

        let payload = Vec::deserialize(reader).await?;

        Ok(Self {
            action,
            username,
            payload,
        })
    }
}

#[async_trait]
impl Deserialize for Response {
    type Error = DeserializeError;

    async fn deserialize<R: AsyncReadExt + Unpin + Send>(
        reader: &mut R,
    ) -> Result<Self, Self::Error> {
        let status = read_i32_ne(reader).await?;
        let payload = Vec::deserialize(reader).await?;

        Ok(Self { status, payload })
    }
}
