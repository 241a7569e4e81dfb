/*
 * vSMTP mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/

use crate::{command::Command, Error, UnparsedArgs, Verb};
use tokio::io::AsyncReadExt;

/// Longest command line accepted, including the terminating `\r\n`.
const COMMAND_LINE_MAX: usize = 512;

fn find(bytes: &[u8], search: &[u8]) -> Option<usize> {
    bytes
        .windows(search.len())
        .position(|window| window == search)
}

fn parse_command(line: Vec<u8>) -> Command<Verb, UnparsedArgs> {
    <Verb as strum::VariantNames>::VARIANTS
        .iter()
        .filter(|i| line.len() >= i.len() && line[..i.len()].eq_ignore_ascii_case(i.as_bytes()))
        .find_map(|i| i.parse::<Verb>().ok().map(|verb| (verb, i.len())))
        .map_or_else(
            || (Verb::Unknown, UnparsedArgs(line.clone())),
            |(verb, len)| (verb, UnparsedArgs(line[len..].to_vec())),
        )
}

/// Stream for reading commands from the client.
///
/// Bytes read past the end of a line are kept for the next stream produced,
/// so pipelined commands survive the switch between commands and message.
pub struct Reader<R: tokio::io::AsyncRead + Unpin + Send> {
    inner: R,
    buffer: bytes::BytesMut,
    additional_reserve: usize,
}

impl<R: tokio::io::AsyncRead + Unpin + Send> Reader<R> {
    /// Create a new stream.
    #[must_use]
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buffer: bytes::BytesMut::new(),
            additional_reserve: 100,
        }
    }

    /// Produce a stream of "\r\n" terminated lines.
    pub fn as_line_stream(
        &mut self,
    ) -> impl tokio_stream::Stream<Item = std::io::Result<Vec<u8>>> + '_ {
        async_stream::try_stream! {
            loop {
                if let Some(pos) = find(&self.buffer, b"\r\n") {
                    let out = self.buffer.split_to(pos + 2);
                    yield Vec::<u8>::from(out);
                } else {
                    self.buffer.reserve(self.additional_reserve);
                    let read_size = self.inner.read_buf(&mut self.buffer).await?;
                    if read_size == 0 {
                        if !self.buffer.is_empty() {
                            Err(std::io::Error::new(
                                std::io::ErrorKind::UnexpectedEof,
                                format!("connection closed with {} unterminated bytes", self.buffer.len()),
                            ))?;
                        }
                        return;
                    }
                }
            }
        }
    }

    /// Produce the lines of a message, until the terminating `.<CRLF>`.
    ///
    /// Dot-stuffing is removed. If the message exceeds `size_limit` the rest of
    /// it is still consumed, and the last item is [`Error::BufferTooLong`].
    pub fn as_message_stream(
        &mut self,
        size_limit: usize,
    ) -> impl tokio_stream::Stream<Item = Result<Vec<u8>, Error>> + '_ {
        async_stream::stream! {
            let mut size = 0;

            for await line in self.as_line_stream() {
                let mut line = match line {
                    Ok(line) => line,
                    Err(error) => {
                        yield Err(Error::Io(error));
                        return;
                    }
                };

                if line == b".\r\n" {
                    if size > size_limit {
                        yield Err(Error::BufferTooLong { expected: size_limit, got: size });
                    }
                    return;
                }

                if line.first() == Some(&b'.') {
                    line.remove(0);
                }

                size += line.len();
                if size <= size_limit {
                    yield Ok(line);
                }
            }

            yield Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed before the end of the message",
            )));
        }
    }

    /// Produce a stream of ESMTP commands.
    pub(crate) fn as_command_stream(
        &mut self,
    ) -> impl tokio_stream::Stream<Item = Result<Command<Verb, UnparsedArgs>, Error>> + '_ {
        async_stream::stream! {
            for await line in self.as_line_stream() {
                let line = match line {
                    Ok(line) => line,
                    Err(error) => {
                        yield Err(Error::Io(error));
                        return;
                    }
                };

                if line.len() > COMMAND_LINE_MAX {
                    yield Err(Error::BufferTooLong { expected: COMMAND_LINE_MAX, got: line.len() });
                    continue;
                }

                yield Ok(parse_command(line));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Reader;
    use crate::{Error, Verb};
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn lines() {
        let input = b"HELO foo\r\nNOOP\r\n".to_vec();
        let mut reader = Reader::new(input.as_slice());

        let lines = reader
            .as_line_stream()
            .collect::<std::io::Result<Vec<_>>>()
            .await
            .unwrap();
        pretty_assertions::assert_eq!(lines, vec![b"HELO foo\r\n".to_vec(), b"NOOP\r\n".to_vec()]);
    }

    #[tokio::test]
    async fn unterminated_line() {
        let input = b"HELO foo".to_vec();
        let mut reader = Reader::new(input.as_slice());

        let lines = reader.as_line_stream().collect::<Vec<_>>().await;
        pretty_assertions::assert_eq!(lines.len(), 1);
        assert!(lines[0].is_err());
    }

    #[tokio::test]
    async fn commands() {
        let input = b"mail from:<a@b>\r\nData\r\nFOO\r\n".to_vec();
        let mut reader = Reader::new(input.as_slice());

        let commands = reader.as_command_stream().collect::<Vec<_>>().await;
        let verbs = commands
            .into_iter()
            .map(|command| command.unwrap())
            .map(|(verb, args)| (verb, args.0))
            .collect::<Vec<_>>();

        assert!(matches!(&verbs[0], (Verb::MailFrom, args) if args == b"<a@b>\r\n"));
        assert!(matches!(&verbs[1], (Verb::Data, args) if args.is_empty()));
        assert!(matches!(&verbs[2], (Verb::Unknown, args) if args == b"FOO\r\n"));
    }

    #[tokio::test]
    async fn message_dot_stuffing() {
        let input = b"a\r\n..b\r\n.\r\nQUIT\r\n".to_vec();
        let mut reader = Reader::new(input.as_slice());

        let lines = reader
            .as_message_stream(1000)
            .collect::<Result<Vec<_>, Error>>()
            .await
            .unwrap();
        pretty_assertions::assert_eq!(lines, vec![b"a\r\n".to_vec(), b".b\r\n".to_vec()]);
    }

    #[tokio::test]
    async fn message_too_long_is_consumed() {
        let input = b"aaaa\r\nbbbb\r\ncccc\r\n.\r\nQUIT\r\n".to_vec();
        let mut reader = Reader::new(input.as_slice());

        let lines = reader.as_message_stream(10).collect::<Vec<_>>().await;
        pretty_assertions::assert_eq!(lines.len(), 2);
        assert!(matches!(
            lines[1],
            Err(Error::BufferTooLong {
                expected: 10,
                got: 18
            })
        ));

        let line_stream = reader.as_line_stream();
        tokio::pin!(line_stream);
        let next = line_stream.next().await.unwrap().unwrap();
        pretty_assertions::assert_eq!(next, b"QUIT\r\n".to_vec());
    }
}
