use std::io::{self, Cursor};

use crate::message::{read_string, write_string};

#[derive(Debug)]
pub struct Put {
    pub key: String,
    pub value: String,
}

#[derive(Debug)]
pub struct Get {
    pub key: String,
}

#[derive(Debug)]
pub struct Delete {
    pub key: String,
}

#[derive(Debug)]
pub struct Success {
    pub key: String,
    pub value: String,
}

#[derive(Debug)]
pub struct Failure {
    pub key: String,
}

impl Put {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        let key = read_string(&mut cursor)?;
        let value = read_string(&mut cursor)?;

        Ok(Put { key, value })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        write_string(buffer, &self.key)?;
        write_string(buffer, &self.value)
    }
}

impl Get {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        let key = read_string(&mut cursor)?;

        Ok(Get { key })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        write_string(buffer, &self.key)
    }
}

impl Delete {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        let key = read_string(&mut cursor)?;

        Ok(Delete { key })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        write_string(buffer, &self.key)
    }
}

impl Success {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        let key = read_string(&mut cursor)?;
        let value = read_string(&mut cursor)?;

        Ok(Success { key, value })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        write_string(buffer, &self.key)?;
        write_string(buffer, &self.value)
    }
}

impl Failure {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        let key = read_string(&mut cursor)?;

        Ok(Failure { key })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        write_string(buffer, &self.key)
    }
}
