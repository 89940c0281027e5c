use std::fmt;

/// Outcome of one operator command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Ok,
    Nok,
    /// The session is over.
    Quit,
}

impl Response {
    /// Fold two outcomes of the same batch: `Quit` beats `Nok` beats `Ok`.
    pub fn combine(self, other: Response) -> Response {
        use Response::*;
        match (self, other) {
            (Quit, _) | (_, Quit) => Quit,
            (Nok, _) | (_, Nok) => Nok,
            (Ok, Ok) => Ok,
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Response::Ok => "OK",
            Response::Nok => "NOK",
            Response::Quit => "QUIT",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_display() {
        assert_eq!(Response::Ok.to_string(), "OK");
        assert_eq!(Response::Nok.to_string(), "NOK");
        assert_eq!(Response::Quit.to_string(), "QUIT");
    }

    #[test]
    fn response_combine_precedence() {
        assert_eq!(Response::Ok.combine(Response::Ok), Response::Ok);
        assert_eq!(Response::Ok.combine(Response::Nok), Response::Nok);
        assert_eq!(Response::Nok.combine(Response::Quit), Response::Quit);
        assert_eq!(Response::Quit.combine(Response::Ok), Response::Quit);
    }
}
