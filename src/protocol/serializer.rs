use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::{
    message::{Request, Response},
    MAX_FIELD_LEN,
};

#[async_trait]
pub trait Serialize: Sized {
    type Error;

    // Serialize a structure into a writer
    async fn serialize<W: AsyncWriteExt + Unpin + Send>(
        &self,
        writer: &mut W,
    ) -> Result<(), Self::Error>;
}

#[derive(thiserror::Error, Debug)]
pub enum SerializeError {
    #[error("The input is too long!")]
    TooLong,

    #[error("{0}")]
    Io(#[from] tokio::io::Error),
}

#[async_trait]
impl Serialize for &[u8] {
    type Error = SerializeError;

    async fn serialize<W: AsyncWriteExt + Unpin + Send>(
        &self,
        writer: &mut W,
    ) -> Result<(), Self::Error> {
        if self.len() > MAX_FIELD_LEN {
            return Err(SerializeError::TooLong);
        }

        writer.write_all(&(self.len() as u64).to_ne_bytes()).await?;
        writer.write_all(self).await?;

        Ok(())
    }
}

#[async_trait]
impl Serialize for Request {
    type Error = SerializeError;

    async fn serialize<W: AsyncWriteExt + Unpin + Send>(
        &self,
        writer: &mut W,
    ) -> Result<(), Self::Error> {
        writer
            .write_all(&i32::from(self.action).to_ne_bytes())
            .await?;

        let username = self.username.as_deref().unwrap_or_default().as_bytes();
        username.serialize(writer).await?;
        self.payload.as_slice().serialize(writer).await?;

        Ok(())
    }
}

#[async_trait]
impl Serialize for Response {
    type Error = SerializeError;

    async fn serialize<W: AsyncWriteExt + Unpin + Send>(
        &self,
        writer: &mut W,
    ) -> Result<(), Self::Error> {
        writer.write_all(&self.status.to_ne_bytes()).await?;
        self.payload.as_slice().serialize(writer).await?;

        Ok(())
    }
}
